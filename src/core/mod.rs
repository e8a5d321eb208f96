pub mod checkout;
pub mod commit;
pub mod history;
pub mod ignore_io;
pub mod index_io;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod staging;
pub mod status;
pub mod tag;

pub use crate::domain::model::{GitObject, ObjectKind};
pub use crate::domain::ports::ObjectStore;
pub use crate::utils::error::Result;
pub use repository::Repository;
