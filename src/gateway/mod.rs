pub mod decryption;
