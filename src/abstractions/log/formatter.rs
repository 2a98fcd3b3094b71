//! Field formatting for log events. Hides the bookkeeping fields (`threshold`, `critical`) and prints the message
//! without quoting.

use std::fmt::{Debug, Write};

use tracing::field::{Field, Visit};
use tracing_subscriber::{
  field::RecordFields,
  fmt::{
    format::Writer,
    FormatFields
  }
};

pub(crate) struct CompactFieldFormatter;

impl<'writer> FormatFields<'writer> for CompactFieldFormatter {
  fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> std::fmt::Result {
    let mut visitor = CompactFieldVisitor { writer };
    fields.record(&mut visitor);
    Ok(())
  }
}

struct CompactFieldVisitor<'writer> {
  writer: Writer<'writer>,
}

impl<'writer> Visit for CompactFieldVisitor<'writer> {
  fn record_i64(&mut self, field: &Field, value: i64) {
    if field.name() != "threshold" {
      let _ = write!(self.writer, "{}={} ", field.name(), value);
    }
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    if field.name() != "threshold" {
      let _ = write!(self.writer, "{}={} ", field.name(), value);
    }
  }

  fn record_bool(&mut self, field: &Field, value: bool) {
    match (field.name(), value) {
      ("critical", true)  => { let _ = self.writer.write_str("[CRITICAL] "); }
      ("critical", false) => {}
      (name, value)       => { let _ = write!(self.writer, "{}={} ", name, value); }
    }
  }

  fn record_str(&mut self, field: &Field, value: &str) {
    match field.name() {
      "message" => { let _ = self.writer.write_str(value); }
      name      => { let _ = write!(self.writer, "{}={:?} ", name, value); }
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
    match field.name() {
      "message"   => { let _ = write!(self.writer, "{:?}", value); }
      "threshold" => {}
      name        => { let _ = write!(self.writer, "{}={:?} ", name, value); }
    }
  }
}
