//! Helpers shared by the web application and the report builders:
//! lenient form parsing, month periods and pagination arithmetic.

mod forms;
mod pagination;
mod period;

pub use forms::{
    FormError, format_date, format_datetime, non_empty, parse_date, parse_decimal,
    parse_integer, parse_iso_date, parse_optional_date,
};
pub use pagination::{PageInfo, Pagination, DEFAULT_PER_PAGE, MAX_PAGE, MAX_PER_PAGE};
pub use period::{DateRange, MonthPeriod, kyiv_now, kyiv_today};
