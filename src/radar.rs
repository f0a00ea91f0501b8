//! Radar coordinate strings decoded into an 8x8 grid.
//!
//! Input is `|`-separated segments of 3-character cells: a column letter
//! `a`..`h`, a value character and a row digit `1`..`8`. Row 1 is drawn at
//! the bottom, so it lands in the last grid row.

pub const GRID_SIZE: usize = 8;

/// Character of cells nobody wrote to
pub const EMPTY_CELL: char = '0';

pub type Grid = [[char; GRID_SIZE]; GRID_SIZE];

pub fn parse_coordinates(input: &str) -> Grid {
  let mut grid = [[EMPTY_CELL; GRID_SIZE]; GRID_SIZE];

  for segment in input.split('|').filter(|s| !s.is_empty()) {
    let chars: Vec<char> = segment.chars().collect();
    for cell in chars.chunks(3) {
      if let Some((row, column, value)) = parse_cell(cell) {
        grid[GRID_SIZE - 1 - row][column] = value;
      }
    }
  }

  grid
}

/// Decode one cell into (row, column, value), both indices zero based.
fn parse_cell(cell: &[char]) -> Option<(usize, usize, char)> {
  let &[column, value, row] = cell else {
    return None;
  };

  let column = (column.to_ascii_lowercase() as u32).checked_sub('a' as u32)? as usize;
  let row = (row.to_digit(10)? as usize).checked_sub(1)?;

  (column < GRID_SIZE && row < GRID_SIZE).then_some((row, column, value))
}

/// One line per grid row, cells separated by spaces.
pub fn render(grid: &Grid) -> String {
  grid
    .iter()
    .map(|row| {
      row
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(" ")
    })
    .collect::<Vec<_>>()
    .join("\n")
}
