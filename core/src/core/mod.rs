pub mod machine;

pub use machine::{InputButton, Machine, SampleSource};
