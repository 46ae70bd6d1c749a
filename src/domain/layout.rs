// Layout engine - packs panel descriptors onto a fixed-width grid
use super::error::DashboardError;
use super::panel::PanelDescriptor;

/// Canonical dashboard grid width, in grid units.
pub const GRID_WIDTH: u32 = 24;
pub const DEFAULT_PANEL_HEIGHT: u32 = 8;
pub const ROW_HEADER_HEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &GridPosition) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A descriptor with its resolved position. `id` is filled in by the
/// document's ID pass; `children` is only populated for collapsed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPanel {
    pub id: Option<u32>,
    pub descriptor: PanelDescriptor,
    pub position: GridPosition,
    pub children: Vec<PlacedPanel>,
}

impl PlacedPanel {
    fn new(descriptor: PanelDescriptor, position: GridPosition) -> Self {
        Self {
            id: None,
            descriptor,
            position,
            children: Vec::new(),
        }
    }

    fn shift_down(&mut self, offset: u32) {
        self.position.y += offset;
        for child in &mut self.children {
            child.shift_down(offset);
        }
    }
}

/// Panels packed left to right, positioned relative to the top of the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: usize,
    panels: Vec<PlacedPanel>,
    height: u32,
}

impl Row {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn panels(&self) -> &[PlacedPanel] {
        &self.panels
    }

    /// Vertical space the row occupies: its tallest panel.
    pub fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    panels: Vec<PlacedPanel>,
    height: u32,
}

impl Column {
    pub fn panels(&self) -> &[PlacedPanel] {
        &self.panels
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn into_panels(self) -> Vec<PlacedPanel> {
        self.panels
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Row(Row),
    /// A row header spans the grid; any other panel is laid out as a row of one.
    Panel(PanelDescriptor),
    /// A row header that owns its panels instead of sitting above them.
    Collapsed {
        header: PanelDescriptor,
        children: Column,
    },
    Column(Column),
}

impl LayoutItem {
    pub fn collapsed(header: PanelDescriptor, children: Column) -> Self {
        Self::Collapsed { header, children }
    }
}

impl From<Row> for LayoutItem {
    fn from(row: Row) -> Self {
        Self::Row(row)
    }
}

impl From<PanelDescriptor> for LayoutItem {
    fn from(panel: PanelDescriptor) -> Self {
        Self::Panel(panel)
    }
}

impl From<Column> for LayoutItem {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

/// Turns rows and columns of descriptors into absolute grid positions.
/// Rows are numbered in the order they are built, starting at 0; that
/// number is what overflow errors report.
#[derive(Debug, Clone)]
pub struct Layout {
    grid_width: u32,
    default_height: u32,
    next_row: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(GRID_WIDTH)
    }
}

impl Layout {
    pub fn new(grid_width: u32) -> Self {
        Self {
            grid_width,
            default_height: DEFAULT_PANEL_HEIGHT,
            next_row: 0,
        }
    }

    pub fn with_default_height(mut self, height: u32) -> Self {
        self.default_height = height;
        self
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn default_height(&self) -> u32 {
        self.default_height
    }

    /// Pin the size of each panel. Pinned dimensions win over any row-level
    /// default when the panels are later placed.
    pub fn resize(
        panels: impl IntoIterator<Item = PanelDescriptor>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Vec<PanelDescriptor>, DashboardError> {
        panels
            .into_iter()
            .map(|panel| {
                if width == Some(0) || height == Some(0) {
                    return Err(DashboardError::invalid_panel(
                        panel.title(),
                        "resized dimensions must be positive",
                    ));
                }
                Ok(panel.with_size(width, height))
            })
            .collect()
    }

    /// Lay panels out left to right.
    ///
    /// `width` applies to every panel that was not resized. Panels with no
    /// width at all share what the explicit widths leave over: each gets the
    /// floor of the even split and the last of them also takes the remainder.
    /// When every width is explicit, trailing space is left empty.
    pub fn row(
        &mut self,
        panels: Vec<PanelDescriptor>,
        height: Option<u32>,
        width: Option<u32>,
    ) -> Result<Row, DashboardError> {
        let index = self.next_row;
        self.next_row += 1;
        let grid_width = self.grid_width;

        let row_height = height.unwrap_or(self.default_height);
        if row_height == 0 {
            return Err(DashboardError::InvalidRow {
                row: index,
                reason: "height must be positive".to_string(),
            });
        }
        if width == Some(0) {
            return Err(DashboardError::InvalidRow {
                row: index,
                reason: "panel width must be positive".to_string(),
            });
        }
        if let Some(header) = panels.iter().find(|p| p.is_row()) {
            return Err(DashboardError::InvalidRow {
                row: index,
                reason: format!("row header '{}' cannot be placed inside a row", header.title()),
            });
        }

        let widths: Vec<Option<u32>> = panels.iter().map(|p| p.width().or(width)).collect();
        let unsized_count = widths.iter().filter(|w| w.is_none()).count() as u32;

        let overflow = |total_width| DashboardError::LayoutOverflow {
            row: index,
            total_width,
            grid_width,
        };

        // A sum past u32::MAX is reported as u32::MAX
        let explicit_total = widths
            .iter()
            .flatten()
            .try_fold(0u32, |total, w| total.checked_add(*w))
            .ok_or_else(|| overflow(u32::MAX))?;
        if explicit_total > grid_width {
            return Err(overflow(explicit_total));
        }

        let (share, remainder) = if unsized_count == 0 {
            (0, 0)
        } else {
            let remaining = grid_width - explicit_total;
            let share = remaining / unsized_count;
            if share == 0 {
                // Every panel needs at least one column
                return Err(overflow(explicit_total.saturating_add(unsized_count)));
            }
            (share, remaining % unsized_count)
        };
        let last_unsized = widths.iter().rposition(|w| w.is_none());

        let mut placed = Vec::with_capacity(panels.len());
        let mut x = 0;
        let mut extent = 0;
        for (position, (panel, width)) in panels.into_iter().zip(widths).enumerate() {
            let panel_width = match width {
                Some(width) => width,
                None if Some(position) == last_unsized => share + remainder,
                None => share,
            };
            let panel_height = panel.height().unwrap_or(row_height);

            placed.push(PlacedPanel::new(
                panel,
                GridPosition::new(x, 0, panel_width, panel_height),
            ));
            x += panel_width;
            extent = extent.max(panel_height);
        }

        tracing::debug!(
            row = index,
            panels = placed.len(),
            used_width = x,
            height = extent,
            "laid out row"
        );

        Ok(Row {
            index,
            panels: placed,
            height: extent,
        })
    }

    /// Stack items top to bottom; each item starts where the previous one ends.
    pub fn column(&mut self, items: Vec<LayoutItem>) -> Result<Column, DashboardError> {
        let mut panels = Vec::new();
        let mut y = 0;

        for item in items {
            match item {
                LayoutItem::Row(row) => {
                    y += Self::stack(&mut panels, row.panels, y, row.height);
                }
                LayoutItem::Panel(panel) if panel.is_row() => {
                    panels.push(self.header(panel, y));
                    y += ROW_HEADER_HEIGHT;
                }
                LayoutItem::Panel(panel) => {
                    let row = self.row(vec![panel], None, None)?;
                    y += Self::stack(&mut panels, row.panels, y, row.height);
                }
                LayoutItem::Collapsed { header, children } => {
                    if !header.is_row() {
                        return Err(DashboardError::invalid_panel(
                            header.title(),
                            "only row panels can hold collapsed children",
                        ));
                    }
                    let mut placed = self.header(header, y);
                    for mut child in children.panels {
                        child.shift_down(y + ROW_HEADER_HEIGHT);
                        placed.children.push(child);
                    }
                    panels.push(placed);
                    y += ROW_HEADER_HEIGHT;
                }
                LayoutItem::Column(column) => {
                    y += Self::stack(&mut panels, column.panels, y, column.height);
                }
            }
        }

        Ok(Column { panels, height: y })
    }

    fn header(&self, panel: PanelDescriptor, y: u32) -> PlacedPanel {
        PlacedPanel::new(panel, GridPosition::new(0, y, self.grid_width, ROW_HEADER_HEIGHT))
    }

    fn stack(target: &mut Vec<PlacedPanel>, block: Vec<PlacedPanel>, y: u32, height: u32) -> u32 {
        for mut panel in block {
            panel.shift_down(y);
            target.push(panel);
        }
        height
    }
}
