use rand::Rng;

const PREFIX: &str = "EXAM-";
const SUFFIX_LEN: usize = 8;
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Student-facing exam code such as `EXAM-7KQ2MZ4D`.
pub(crate) fn generate_exam_code() -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(PREFIX.len() + SUFFIX_LEN);
    output.push_str(PREFIX);
    for _ in 0..SUFFIX_LEN {
        let index = rng.gen_range(0..ALPHABET.len());
        output.push(ALPHABET[index] as char);
    }
    output
}
