pub mod compiler;

pub use compiler::ScriptCompiler;
