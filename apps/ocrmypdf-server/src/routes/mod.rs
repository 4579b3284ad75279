//! Route modules for the OCRmyPDF server

pub mod health;
pub mod ocr;
