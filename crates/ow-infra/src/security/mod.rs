pub mod passphrase_file;

pub use passphrase_file::FilePassphraseStore;
