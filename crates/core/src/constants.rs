/// Decimal places kept for share quantities and prices in imported holdings
pub const DECIMAL_PRECISION: u32 = 6;

/// Date format used for purchase dates on the wire
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
