pub mod keyring_password;
