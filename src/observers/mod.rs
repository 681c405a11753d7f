// Observers consuming solver frames as they are produced

pub mod diagnostics;
