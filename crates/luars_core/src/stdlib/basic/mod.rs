// Basic library support: number parsing for tonumber and string coercion
pub mod parse_number;
