// Domain layer - Dashboard model and layout, free of I/O
pub mod dashboard;
pub mod error;
pub mod layout;
pub mod panel;
