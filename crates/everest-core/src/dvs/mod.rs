//! # Data Validation Summary (DVS)
//!
//! A DVS is a letter-sized page divided into numbered cells. The page layout
//! is a 22 x 12 grid of integers; every distinct integer `n` (counted up from
//! 0 until the first gap) names a cell spanning the bounding box of its
//! grid positions.
//!
//! Cell placement follows a subplot grid: page margins become subplot
//! fractions, and `hspace`/`wspace` are gaps expressed as fractions of the
//! average grid cell height/width.

mod render;

pub use render::Panel;

use crate::EverestError;
use crate::config::DvsConfig;
use std::fmt;

/// Number of grid rows in a layout.
pub const LAYOUT_ROWS: usize = 22;

/// Number of grid columns in a layout.
pub const LAYOUT_COLS: usize = 12;

/// Highest cell number considered when scanning a layout.
pub const MAX_CELLS: u32 = 99;

/// Page width in inches (US letter).
pub const PAGE_WIDTH: f64 = 8.5;

/// Page height in inches (US letter).
pub const PAGE_HEIGHT: f64 = 11.0;

/// The default DVS page layout.
pub const DEFAULT_LAYOUT: [[u32; LAYOUT_COLS]; LAYOUT_ROWS] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2],
    [1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2],
    [1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2],
    [1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2],
    [4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5],
    [4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5],
    [4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5],
    [4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5],
    [6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7],
    [6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7],
    [6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7],
    [6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7],
    [8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9],
    [8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9],
    [8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9],
    [8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9],
    [10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10],
];

// =============================================================================
// LAYOUT
// =============================================================================

/// A 22 x 12 grid assigning each position to a numbered cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    grid: Vec<u32>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            grid: DEFAULT_LAYOUT.iter().flatten().copied().collect(),
        }
    }
}

impl Layout {
    /// Parse a layout from whitespace-separated integers.
    ///
    /// `;` and `,` are accepted as separators too. Exactly 22 x 12 values
    /// are required, read row by row.
    pub fn parse(text: &str) -> Result<Self, EverestError> {
        let grid = text
            .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<u32>().map_err(|_| {
                    EverestError::InvalidLayout(format!("'{}' is not a cell number", token))
                })
            })
            .collect::<Result<Vec<u32>, EverestError>>()?;

        if grid.len() != LAYOUT_ROWS * LAYOUT_COLS {
            return Err(EverestError::InvalidLayout(format!(
                "layout has {} entries; it must have shape ({}, {})",
                grid.len(),
                LAYOUT_ROWS,
                LAYOUT_COLS
            )));
        }
        Ok(Self { grid })
    }

    /// Cell number at a grid position.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row >= LAYOUT_ROWS || col >= LAYOUT_COLS {
            return None;
        }
        self.grid.get(row * LAYOUT_COLS + col).copied()
    }

    /// Bounding boxes of cells 0, 1, ... up to the first missing number.
    #[must_use]
    pub fn extents(&self) -> Vec<CellExtent> {
        let mut extents = Vec::new();
        for n in 0..MAX_CELLS {
            let mut bounds: Option<(usize, usize, usize, usize)> = None;
            for (i, _) in self.grid.iter().enumerate().filter(|(_, v)| **v == n) {
                let (y, x) = (i / LAYOUT_COLS, i % LAYOUT_COLS);
                bounds = Some(match bounds {
                    None => (x, x, y, y),
                    Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
                });
            }
            let Some((x0, x1, y0, y1)) = bounds else {
                break;
            };
            extents.push(CellExtent {
                n: n as usize,
                x: x0,
                y: y0,
                dx: x1 - x0 + 1,
                dy: y1 - y0 + 1,
            });
        }
        extents
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.grid.chunks(LAYOUT_COLS) {
            for value in row {
                write!(f, "{:>3}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Grid-space bounding box of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellExtent {
    /// Cell number.
    pub n: usize,
    /// Leftmost grid column.
    pub x: usize,
    /// Topmost grid row.
    pub y: usize,
    /// Number of grid columns spanned.
    pub dx: usize,
    /// Number of grid rows spanned.
    pub dy: usize,
}

// =============================================================================
// PAGE GEOMETRY
// =============================================================================

/// A rectangle on the page in inches, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Distance from the left page edge.
    pub left: f64,
    /// Distance from the top page edge.
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A placed DVS cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Position in the layout grid.
    pub extent: CellExtent,
    /// Position on the page, in inches.
    pub frame: Frame,
}

/// Page size and subplot parameters (figure fractions, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Figure {
    /// Page width in inches.
    pub width: f64,
    /// Page height in inches.
    pub height: f64,
    /// Left edge of the subplot area, as a fraction of the width.
    pub left: f64,
    /// Right edge of the subplot area, as a fraction of the width.
    pub right: f64,
    /// Bottom edge of the subplot area, as a fraction of the height.
    pub bottom: f64,
    /// Top edge of the subplot area, as a fraction of the height.
    pub top: f64,
    /// Gap between grid rows, as a fraction of the row height.
    pub hspace: f64,
    /// Gap between grid columns, as a fraction of the column width.
    pub wspace: f64,
}

/// Options for building a DVS page.
#[derive(Debug, Clone, PartialEq)]
pub struct DvsOptions {
    /// Page layout.
    pub layout: Layout,
    /// Margin size in inches.
    pub margins: f64,
    /// Label each cell with its number.
    pub labels: bool,
    /// Vertical gap between grid rows, as a fraction of the row height.
    pub hspace: f64,
    /// Horizontal gap between grid columns, as a fraction of the column width.
    pub wspace: f64,
}

impl Default for DvsOptions {
    fn default() -> Self {
        Self::from(&DvsConfig::default())
    }
}

impl From<&DvsConfig> for DvsOptions {
    fn from(config: &DvsConfig) -> Self {
        Self {
            layout: Layout::default(),
            margins: config.margins,
            labels: config.labels,
            hspace: config.hspace,
            wspace: config.wspace,
        }
    }
}

/// A data validation summary page: numbered cells arranged by a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Dvs {
    figure: Figure,
    labels: bool,
    cells: Vec<Cell>,
}

impl Dvs {
    /// Lay out a DVS page.
    pub fn new(options: DvsOptions) -> Result<Self, EverestError> {
        let figure = Figure {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            left: options.margins / PAGE_WIDTH,
            right: 1.0 - options.margins / PAGE_WIDTH,
            bottom: options.margins / PAGE_HEIGHT,
            top: 1.0 - options.margins / PAGE_HEIGHT,
            hspace: options.hspace,
            wspace: options.wspace,
        };
        if figure.left >= figure.right || figure.bottom >= figure.top {
            return Err(EverestError::InvalidLayout(format!(
                "margins of {} in leave no room on the page",
                options.margins
            )));
        }
        if options.hspace < 0.0 || options.wspace < 0.0 {
            return Err(EverestError::InvalidLayout(
                "hspace and wspace must be non-negative".to_string(),
            ));
        }

        let extents = options.layout.extents();
        if extents.is_empty() {
            return Err(EverestError::InvalidLayout(
                "layout has no cell numbered 0".to_string(),
            ));
        }

        let cells = extents
            .into_iter()
            .map(|extent| Cell {
                extent,
                frame: place(&figure, &extent),
            })
            .collect();

        Ok(Self {
            figure,
            labels: options.labels,
            cells,
        })
    }

    /// The page and its subplot parameters.
    #[must_use]
    pub fn fig(&self) -> &Figure {
        &self.figure
    }

    /// All cells, ordered by number.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell number `n`.
    #[must_use]
    pub fn cell(&self, n: usize) -> Option<&Cell> {
        self.cells.get(n)
    }

    /// The header cell (cell 0).
    #[must_use]
    pub fn header(&self) -> Option<&Cell> {
        self.cell(0)
    }

    /// The raw light curve cell (cell 1).
    #[must_use]
    pub fn raw(&self) -> Option<&Cell> {
        self.cell(1)
    }

    /// The de-trended light curve cell (cell 3).
    #[must_use]
    pub fn detrended(&self) -> Option<&Cell> {
        self.cell(3)
    }

    /// The footer cell (the highest-numbered cell).
    #[must_use]
    pub fn footer(&self) -> Option<&Cell> {
        self.cells.last()
    }

    /// Whether cells carry visual labels.
    #[must_use]
    pub fn labels(&self) -> bool {
        self.labels
    }
}

/// Place a grid extent on the page.
fn place(figure: &Figure, extent: &CellExtent) -> Frame {
    let rows = LAYOUT_ROWS as f64;
    let cols = LAYOUT_COLS as f64;

    let total_height = figure.top - figure.bottom;
    let cell_h = total_height / (rows + figure.hspace * (rows - 1.0));
    let sep_h = figure.hspace * cell_h;

    let total_width = figure.right - figure.left;
    let cell_w = total_width / (cols + figure.wspace * (cols - 1.0));
    let sep_w = figure.wspace * cell_w;

    let top = figure.top - extent.y as f64 * (cell_h + sep_h);
    let bottom = figure.top - (extent.y + extent.dy - 1) as f64 * (cell_h + sep_h) - cell_h;
    let left = figure.left + extent.x as f64 * (cell_w + sep_w);
    let right = figure.left + (extent.x + extent.dx - 1) as f64 * (cell_w + sep_w) + cell_w;

    Frame {
        left: left * figure.width,
        top: (1.0 - top) * figure.height,
        width: (right - left) * figure.width,
        height: (top - bottom) * figure.height,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_text_parses_back() {
        let text = Layout::default().to_string();
        assert_eq!(Layout::parse(&text).unwrap(), Layout::default());
    }

    #[test]
    fn default_layout_has_eleven_cells() {
        let extents = Layout::default().extents();
        assert_eq!(extents.len(), 11);
        assert_eq!(
            extents[0],
            CellExtent {
                n: 0,
                x: 0,
                y: 0,
                dx: 12,
                dy: 1
            }
        );
        assert_eq!(
            extents[2],
            CellExtent {
                n: 2,
                x: 8,
                y: 1,
                dx: 4,
                dy: 8
            }
        );
        assert_eq!(extents[10].y, 21);
    }

    #[test]
    fn wrong_size_rejected() {
        let result = Layout::parse("0 0 0");
        assert!(matches!(result, Err(EverestError::InvalidLayout(_))));
    }

    #[test]
    fn non_numeric_rejected() {
        let text = Layout::default().to_string().replacen('5', "x", 1);
        assert!(matches!(
            Layout::parse(&text),
            Err(EverestError::InvalidLayout(_))
        ));
    }

    #[test]
    fn scan_stops_at_first_gap() {
        // Cells 0 and 2 only: cell 2 is never reached
        let mut text = String::new();
        for i in 0..LAYOUT_ROWS * LAYOUT_COLS {
            text.push_str(if i < 12 { "0 " } else { "2 " });
        }
        let layout = Layout::parse(&text).unwrap();
        assert_eq!(layout.extents().len(), 1);
    }

    #[test]
    fn figure_fractions_from_margins() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let fig = dvs.fig();
        assert!((fig.left - 0.5 / 8.5).abs() < 1e-12);
        assert!((fig.top - (1.0 - 0.5 / 11.0)).abs() < 1e-12);
    }

    #[test]
    fn full_width_cell_spans_margins() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let header = dvs.header().unwrap().frame;
        assert!((header.left - 0.5).abs() < 1e-9);
        assert!((header.width - 7.5).abs() < 1e-9);
        assert!((header.top - 0.5).abs() < 1e-9);
        let footer = dvs.footer().unwrap().frame;
        assert!((footer.top + footer.height - 10.5).abs() < 1e-9);
    }

    #[test]
    fn cells_do_not_overlap_horizontally() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let raw = dvs.raw().unwrap().frame;
        let side = dvs.cell(2).unwrap().frame;
        assert!(raw.left + raw.width < side.left);
    }

    #[test]
    fn huge_margins_rejected() {
        let options = DvsOptions {
            margins: 5.0,
            ..DvsOptions::default()
        };
        assert!(matches!(
            Dvs::new(options),
            Err(EverestError::InvalidLayout(_))
        ));
    }
}
