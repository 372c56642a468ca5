pub mod order_writer;

pub use order_writer::OrderWriter;
