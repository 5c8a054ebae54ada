mod subject;

pub use subject::*;
