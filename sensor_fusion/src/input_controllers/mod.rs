pub mod line_input_controller;
