pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod source;
pub mod state;
pub mod processing {
    pub mod color;
    pub mod composite;
    pub mod layout;
    pub mod mask;
}
pub mod render {
    pub mod viewer;
}

pub use error::Error;
