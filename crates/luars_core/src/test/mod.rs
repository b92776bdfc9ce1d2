pub mod test_pack;
pub mod test_string;
