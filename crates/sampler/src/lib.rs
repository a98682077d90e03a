pub mod parser;
pub mod process;

pub use parser::{parse_cpu, parse_gpu, parse_line, parse_memory};
pub use process::SamplerProcess;
