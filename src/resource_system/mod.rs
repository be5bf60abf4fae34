pub mod file_formats;
