pub mod adc_event;
pub mod constants;
pub mod gradient_event;
pub mod pulse;
pub mod rf_event;
pub mod scanner;
pub mod sequence;
pub mod time_grid;
