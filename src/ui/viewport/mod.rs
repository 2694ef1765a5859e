pub mod column_width_calculator;
pub mod layout;
