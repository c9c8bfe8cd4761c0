//! Decoders for values held in bound buffers.
//!
//! | Data | Module |
//! |------|--------|
//! | DATE/TIME/TIMESTAMP structs | `date` |
//! | numeric and boolean text | `number` |
//! | narrow and wide character data | `text` |

mod date;
mod number;
mod text;

pub use date::{
    parse_datetime_text, read_date_struct, read_time_struct, read_timestamp_struct, write_date_struct,
    write_time_struct, write_timestamp_struct, DateTimeFields,
};
pub use number::{format_numeric, parse_bool_text, parse_integer_text, parse_numeric_text};
pub use text::{decode_text, encode_text, encoding_of, text_room};
