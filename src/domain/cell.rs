/// Cell types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Cell {
    #[default]
    Floor,
    Wall,
}

impl Cell {
    /// Decode the level-data representation (`0` = floor, `1` = wall).
    pub fn from_code(code: u8) -> Option<Cell> {
        match code {
            0 => Some(Cell::Floor),
            1 => Some(Cell::Wall),
            _ => None,
        }
    }

    /// Encode back to the level-data representation.
    pub fn code(self) -> u8 {
        match self {
            Cell::Floor => 0,
            Cell::Wall => 1,
        }
    }

    /// Does this cell produce a wall box and block movement?
    pub fn is_solid(self) -> bool {
        matches!(self, Cell::Wall)
    }

    /// Can the player stand here, and can keys or a portal be placed here?
    pub fn is_floor(self) -> bool {
        !self.is_solid()
    }
}
