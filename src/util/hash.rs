use sha2::{Digest, Sha256};

pub fn sha256_digest(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    let result = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&result);
    buf
}

pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let digest = sha256_digest(data);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
