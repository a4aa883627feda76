//! WebAssembly bindings for the Fieldline core library.

mod field;
mod trace;

pub use field::WasmTensorField;
