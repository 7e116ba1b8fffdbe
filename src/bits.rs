//! Bit vectors and the word-at-a-time builder that produces them.
//!
//! A [`BitVector`] holds one bit per row, packed into `u64` words. Search results,
//! null masks, and the inputs and outputs of the boolean algebra used to combine
//! them are all bit vectors.

/// The number of bits packed into each backing word.
pub const BITS_IN_WORD: u32 = 64;

/// The number of words required to hold `bits` bits.
#[inline(always)]
fn words_for(bits: u32) -> usize {
    bits.div_ceil(BITS_IN_WORD) as usize
}

/// A resizable sequence of bits, packed into `u64` words.
///
/// Bits at positions at or beyond `len` are always zero. The boolean operations
/// rely on this to work a word at a time without masking their inputs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVector {
    /// The bits themselves; the final word may be partially used.
    words: Vec<u64>,
    /// The number of bits, which may not be a multiple of 64.
    len: u32,
}

impl BitVector {
    /// An empty bit vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bit vector of `len` bits, all equal to `fill`.
    pub fn repeat(fill: bool, len: u32) -> Self {
        let word = if fill { u64::MAX } else { 0 };
        let mut result = Self { words: vec![word; words_for(len)], len };
        result.clear_tail();
        result
    }

    /// A bit vector of length `end` with exactly the bits in `[start, end)` set.
    pub fn range(start: u32, end: u32) -> Self {
        let mut result = Self::repeat(true, end);
        result.retain_window(start, end);
        result
    }

    /// Reassembles a bit vector from its words. Bits at or beyond `len` are discarded.
    pub fn from_words(mut words: Vec<u64>, len: u32) -> Self {
        assert!(
            words.len() >= words_for(len),
            "{} words cannot hold {} bits",
            words.len(),
            len
        );
        words.truncate(words_for(len));
        let mut result = Self { words, len };
        result.clear_tail();
        result
    }

    /// The backing words, least significant bit first.
    #[inline(always)]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the bit at `index` is set.
    #[inline(always)]
    pub fn is_set(&self, index: u32) -> bool {
        debug_assert!(index < self.len, "bit {} out of bounds for length {}", index, self.len);
        let word = self.words[(index / BITS_IN_WORD) as usize];
        (word >> (index % BITS_IN_WORD)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, index: u32) {
        assert!(index < self.len, "bit {} out of bounds for length {}", index, self.len);
        self.words[(index / BITS_IN_WORD) as usize] |= 1 << (index % BITS_IN_WORD);
    }

    #[inline]
    pub fn clear(&mut self, index: u32) {
        assert!(index < self.len, "bit {} out of bounds for length {}", index, self.len);
        self.words[(index / BITS_IN_WORD) as usize] &= !(1 << (index % BITS_IN_WORD));
    }

    /// Appends a single bit.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        let offset = self.len % BITS_IN_WORD;
        if offset == 0 {
            self.words.push(0);
        }
        if let Some(last) = self.words.last_mut() {
            *last |= (bit as u64) << offset;
        }
        self.len += 1;
    }

    /// The number of set bits.
    pub fn count_set_bits(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// The positions of set bits, in increasing order.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(block, &word)| {
            let base = block as u32 * BITS_IN_WORD;
            let mut word = word;
            std::iter::from_fn(move || {
                (word != 0).then(|| {
                    let bit = word.trailing_zeros();
                    word &= word - 1;
                    base + bit
                })
            })
        })
    }

    /// Flips every bit.
    pub fn not(&mut self) {
        for word in self.words.iter_mut() {
            *word = !*word;
        }
        self.clear_tail();
    }

    /// Sets each bit to `self[i] && other[i]`.
    ///
    /// The length of `self` is unchanged; bits of `self` beyond `other.len()` are cleared.
    pub fn and(&mut self, other: &BitVector) {
        let shared = self.words.len().min(other.words.len());
        for (word, other) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= *other;
        }
        for word in self.words[shared..].iter_mut() {
            *word = 0;
        }
    }

    /// Sets each bit to `self[i] || other[i]`.
    ///
    /// The length of `self` is unchanged; bits of `other` beyond `self.len()` are ignored.
    pub fn or(&mut self, other: &BitVector) {
        for (word, other) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= *other;
        }
        self.clear_tail();
    }

    /// Grows or shrinks to `len` bits; new bits take the value `fill`.
    pub fn resize(&mut self, len: u32, fill: bool) {
        if len > self.len && fill {
            let offset = self.len % BITS_IN_WORD;
            if offset != 0 {
                if let Some(last) = self.words.last_mut() {
                    *last |= u64::MAX << offset;
                }
            }
            self.words.resize(words_for(len), u64::MAX);
        } else {
            self.words.resize(words_for(len), 0);
        }
        self.len = len;
        self.clear_tail();
    }

    /// A bit vector of length `end` whose bits in `[start, end)` mirror `self`.
    ///
    /// Bits outside the window, and bits of the window beyond `self.len()`, are unset.
    pub fn intersect_range(&self, start: u32, end: u32) -> BitVector {
        let end_in_self = end.min(self.len);
        let mut words = self.words[..words_for(end_in_self)].to_vec();
        words.resize(words_for(end), 0);
        let mut result = BitVector { words, len: end };
        result.retain_window(start, end_in_self);
        result
    }

    /// Clears every bit outside of `[start, end)`.
    fn retain_window(&mut self, start: u32, end: u32) {
        let end = end.min(self.len);
        if start >= end {
            self.words.iter_mut().for_each(|word| *word = 0);
            return;
        }
        let first = (start / BITS_IN_WORD) as usize;
        let last = ((end - 1) / BITS_IN_WORD) as usize;
        self.words[..first].iter_mut().for_each(|word| *word = 0);
        self.words[last + 1..].iter_mut().for_each(|word| *word = 0);
        self.words[first] &= u64::MAX << (start % BITS_IN_WORD);
        let end_bits = end % BITS_IN_WORD;
        if end_bits != 0 {
            self.words[last] &= (1u64 << end_bits) - 1;
        }
    }

    /// Restores the invariant that bits at or beyond `len` are zero.
    #[inline(always)]
    fn clear_tail(&mut self) {
        let bits = self.len % BITS_IN_WORD;
        if bits != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << bits) - 1;
            }
        }
    }
}

impl FromIterator<bool> for BitVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut result = BitVector::new();
        for bit in iter {
            result.push(bit);
        }
        result
    }
}

/// Append-only construction of a [`BitVector`] whose size is fixed up front.
///
/// Bits accumulate in a work-in-progress word that is committed once full. Callers
/// that want to hand over whole words with [`Builder::append_word`] first align to
/// a word boundary, using [`Builder::bits_until_word_boundary_or_full`] to learn how
/// many single bits that takes. This works for any starting offset.
#[derive(Debug)]
pub struct Builder {
    /// Completed words.
    words: Vec<u64>,
    /// The work-in-progress bits that are not yet a complete word.
    last_word: u64,
    /// The number of bits in `last_word`.
    last_bits: u32,
    /// The number of bits appended so far, including skipped ones.
    appended: u32,
    /// The final number of bits.
    size: u32,
}

impl Builder {
    /// A builder for `size` bits.
    pub fn new(size: u32) -> Self {
        Self::with_offset(size, 0)
    }

    /// A builder for `size` bits whose first `skip` bits are already appended, unset.
    pub fn with_offset(size: u32, skip: u32) -> Self {
        assert!(skip <= size, "cannot skip {} bits of a {} bit builder", skip, size);
        let mut words = Vec::with_capacity(words_for(size));
        words.resize((skip / BITS_IN_WORD) as usize, 0);
        Self {
            words,
            last_word: 0,
            last_bits: skip % BITS_IN_WORD,
            appended: skip,
            size,
        }
    }

    /// Appends a single bit.
    #[inline(always)]
    pub fn append(&mut self, bit: bool) {
        debug_assert!(self.appended < self.size, "append to a full builder");
        self.last_word |= (bit as u64) << self.last_bits;
        self.last_bits += 1;
        self.appended += 1;
        // If we have a fully formed word, commit it.
        if self.last_bits == BITS_IN_WORD {
            self.words.push(self.last_word);
            self.last_word = 0;
            self.last_bits = 0;
        }
    }

    /// Appends 64 bits at once. The builder must be at a word boundary.
    #[inline(always)]
    pub fn append_word(&mut self, word: u64) {
        debug_assert!(self.last_bits == 0, "append_word off a word boundary");
        debug_assert!(self.bits_until_full() >= BITS_IN_WORD, "append_word past the end");
        self.words.push(word);
        self.appended += BITS_IN_WORD;
    }

    /// Single bits to append before reaching a word boundary, or the end.
    #[inline]
    pub fn bits_until_word_boundary_or_full(&self) -> u32 {
        if self.last_bits == 0 {
            0
        } else {
            (BITS_IN_WORD - self.last_bits).min(self.bits_until_full())
        }
    }

    /// Bits that fit in whole words between the next word boundary and the end.
    #[inline]
    pub fn bits_in_complete_words_until_full(&self) -> u32 {
        let aligned = self.bits_until_full() - self.bits_until_word_boundary_or_full();
        aligned / BITS_IN_WORD * BITS_IN_WORD
    }

    /// Bits remaining before the builder is full.
    #[inline]
    pub fn bits_until_full(&self) -> u32 {
        self.size - self.appended
    }

    /// Finishes the bit vector; any bits not appended are unset.
    pub fn build(mut self) -> BitVector {
        if self.last_bits > 0 {
            self.words.push(self.last_word);
        }
        self.words.resize(words_for(self.size), 0);
        BitVector { words: self.words, len: self.size }
    }
}
