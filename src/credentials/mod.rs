pub mod secret_file;

pub use secret_file::SecretFileReloader;
