//! Utility code for working with nucleotide sequences.

lazy_static::lazy_static! {
    /// Complement of each ASCII character; characters other than `ACGTacgt` map to themselves.
    static ref DNA_COMPLEMENT_MAP: [u8; 256] = {
        let mut result = [0; 256];

        for (c, slot) in result.iter_mut().enumerate() {
            *slot = c as u8;
        }

        result[b'A' as usize] = b'T';
        result[b'T' as usize] = b'A';
        result[b'C' as usize] = b'G';
        result[b'G' as usize] = b'C';

        result[b'a' as usize] = b't';
        result[b't' as usize] = b'a';
        result[b'c' as usize] = b'g';
        result[b'g' as usize] = b'c';

        result
    };
}

/// Complement a single nucleotide.
pub fn complement(nt: u8) -> u8 {
    DNA_COMPLEMENT_MAP[nt as usize]
}

/// Reverse complement a byte sequence.
pub fn revcomp_bytes(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|nt| complement(*nt)).collect()
}

/// Reverse complementing shortcut.
pub fn revcomp(seq: &str) -> String {
    String::from_utf8_lossy(&revcomp_bytes(seq.as_bytes())).into_owned()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{complement, revcomp, revcomp_bytes};

    #[test]
    fn revcomp_cases() {
        assert_eq!(revcomp(""), "");
        assert_eq!(revcomp("A"), "T");
        assert_eq!(revcomp("AG"), "CT");
        assert_eq!(revcomp("CGAG"), "CTCG");
        assert_eq!(revcomp("AACG"), "CGTT");
        assert_eq!(revcomp("ACGT"), "ACGT");
    }

    #[test]
    fn revcomp_keeps_case_and_unknown_characters() {
        assert_eq!(revcomp("acgtN"), "Nacgt");
        assert_eq!(revcomp("AR-y"), "y-RT");
        assert_eq!(complement(b'N'), b'N');
        assert_eq!(complement(b'U'), b'U');
    }

    #[test]
    fn revcomp_bytes_smoke() {
        assert_eq!(revcomp_bytes(b"GGCA"), b"TGCC".to_vec());
    }
}

// <LICENSE>
// Copyright 2023 hgvs-rs Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// </LICENSE>
