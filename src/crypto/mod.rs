mod keypair;
mod seal;

pub use keypair::{
    Algorithm, KeyPair, delete_files, fingerprint, key_comment, public_key_path,
};
