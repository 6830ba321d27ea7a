pub mod backend;
pub mod memory;
pub mod rest;
pub mod sheets;
pub mod workbook;
