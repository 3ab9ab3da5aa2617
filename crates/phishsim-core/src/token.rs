/// Generate a fresh tracking token: 32 cryptographically random bytes,
/// hex-encoded (64 URL-safe characters, 256 bits of entropy).
///
/// The token is the sole credential the tracking endpoint accepts, so it
/// must be infeasible to guess or enumerate. Tokens are minted once per
/// target at import time and never rotated — re-sending a campaign reuses
/// the same token so historical events stay attributable.
pub fn new_token() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
