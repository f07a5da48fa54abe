#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Assistant = 2,
    System = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Assistant),
            3 => Some(Role::System),
            _ => None,
        }
    }

    /// People who take attendance. Service accounts never mark a student.
    pub fn can_mark_attendance(&self) -> bool {
        matches!(self, Role::Admin | Role::Assistant)
    }

    /// Callers allowed to start a sweep by hand.
    pub fn can_run_sweeps(&self) -> bool {
        matches!(self, Role::Admin | Role::System)
    }
}
