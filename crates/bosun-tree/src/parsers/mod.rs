//! The bundled component parsers.
//!
//! Hosts can supply their own [`ComponentParser`](crate::parser::ComponentParser)
//! implementations; these cover the common cases and the two variants the
//! tree walker treats specially (flag groups and aggregates).

mod aggregate;
mod flag;
mod integer;
mod literal;
mod string;

pub use aggregate::{AggregateResult, StandardAggregateParser};
pub use flag::{flag_value_key, FlagDefinition, FlagParser, FlagResult, FLAG_META_KEY};
pub use integer::IntegerParser;
pub use literal::LiteralParser;
pub use string::{StringMode, StringParser};
