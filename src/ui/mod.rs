pub mod batch;
pub mod connector;
pub mod note;
pub mod sprite;
pub mod stage;
