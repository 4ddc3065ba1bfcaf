mod categories;
mod documents;
pub mod dto;
mod html;
mod media;
mod pages;
pub mod response;
mod router;

pub use documents::FILES_FIELD;
pub use html::Pages;
pub use router::{AppState, create_router};
