//! Porter stemmer.
//!
//! M. F. Porter, "An algorithm for suffix stripping", Program 14(3), 1980,
//! including the later `bli -> ble` and `logi -> log` revisions. Index terms
//! and query words must go through the same stemmer for lookups to agree.
//!
//! Characters other than vowels count as consonants, so identifiers such as
//! `plot_dvs` stem like words. Non-ASCII words are returned unchanged.

/// Stem a lowercase word.
#[must_use]
pub fn stem(word: &str) -> String {
    if word.len() <= 2 || !word.is_ascii() {
        return word.to_string();
    }
    let mut s = Stemmer::new(word);
    s.step1ab();
    if s.k > 0 {
        s.step1c();
        s.step2();
        s.step3();
        s.step4();
        s.step5();
    }
    s.finish()
}

const STEP2: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("bli", "ble"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
    ("logi", "log"),
];

const STEP3: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou",
    "ism", "ate", "iti", "ous", "ive", "ize",
];

/// Working state: `b[0..=k]` is the current word, `b[0..=j]` the stem
/// under consideration.
struct Stemmer {
    b: Vec<u8>,
    k: isize,
    j: isize,
}

impl Stemmer {
    fn new(word: &str) -> Self {
        let b = word.as_bytes().to_vec();
        let k = b.len() as isize - 1;
        Self { b, k, j: 0 }
    }

    fn finish(mut self) -> String {
        self.b.truncate((self.k + 1).max(0) as usize);
        String::from_utf8_lossy(&self.b).into_owned()
    }

    fn at(&self, i: isize) -> u8 {
        if i < 0 {
            return 0;
        }
        self.b.get(i as usize).copied().unwrap_or(0)
    }

    fn cons(&self, i: isize) -> bool {
        match self.at(i) {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.cons(i - 1),
            _ => true,
        }
    }

    /// Number of vowel-consonant sequences in `b[0..=j]`.
    fn m(&self) -> usize {
        let mut n = 0;
        let mut i = 0;
        loop {
            if i > self.j {
                return n;
            }
            if !self.cons(i) {
                break;
            }
            i += 1;
        }
        i += 1;
        loop {
            loop {
                if i > self.j {
                    return n;
                }
                if self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
            n += 1;
            loop {
                if i > self.j {
                    return n;
                }
                if !self.cons(i) {
                    break;
                }
                i += 1;
            }
            i += 1;
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (0..=self.j).any(|i| !self.cons(i))
    }

    fn double_c(&self, i: isize) -> bool {
        i >= 1 && self.at(i) == self.at(i - 1) && self.cons(i)
    }

    /// consonant-vowel-consonant ending at `i`, the last not w, x or y.
    fn cvc(&self, i: isize) -> bool {
        if i < 2 || !self.cons(i) || self.cons(i - 1) || !self.cons(i - 2) {
            return false;
        }
        !matches!(self.at(i), b'w' | b'x' | b'y')
    }

    fn ends(&mut self, suffix: &str) -> bool {
        let len = suffix.len() as isize;
        if len > self.k + 1 {
            return false;
        }
        let start = (self.k + 1 - len) as usize;
        let end = (self.k + 1) as usize;
        if self.b.get(start..end) != Some(suffix.as_bytes()) {
            return false;
        }
        self.j = self.k - len;
        true
    }

    fn set_to(&mut self, replacement: &str) {
        self.b.truncate((self.j + 1) as usize);
        self.b.extend_from_slice(replacement.as_bytes());
        self.k = self.j + replacement.len() as isize;
    }

    fn replace_if_measured(&mut self, replacement: &str) {
        if self.m() > 0 {
            self.set_to(replacement);
        }
    }

    /// Plurals and -ed or -ing.
    fn step1ab(&mut self) {
        if self.at(self.k) == b's' {
            if self.ends("sses") {
                self.k -= 2;
            } else if self.ends("ies") {
                self.set_to("i");
            } else if self.at(self.k - 1) != b's' {
                self.k -= 1;
            }
        }
        if self.ends("eed") {
            if self.m() > 0 {
                self.k -= 1;
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.k = self.j;
            if self.ends("at") {
                self.set_to("ate");
            } else if self.ends("bl") {
                self.set_to("ble");
            } else if self.ends("iz") {
                self.set_to("ize");
            } else if self.double_c(self.k) {
                self.k -= 1;
                if matches!(self.at(self.k), b'l' | b's' | b'z') {
                    self.k += 1;
                }
            } else if self.m() == 1 && self.cvc(self.k) {
                self.set_to("e");
            }
        }
    }

    /// Terminal y to i when there is another vowel in the stem.
    fn step1c(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            if let Some(last) = self.b.get_mut(self.k as usize) {
                *last = b'i';
            }
        }
    }

    /// Double suffixes to single ones.
    fn step2(&mut self) {
        for (suffix, replacement) in STEP2 {
            if self.ends(suffix) {
                self.replace_if_measured(replacement);
                return;
            }
        }
    }

    /// -ic-, -full, -ness etc.
    fn step3(&mut self) {
        for (suffix, replacement) in STEP3 {
            if self.ends(suffix) {
                self.replace_if_measured(replacement);
                return;
            }
        }
    }

    /// -ant, -ence etc. in context <c>vcvc<v>.
    fn step4(&mut self) {
        for suffix in STEP4 {
            if !self.ends(suffix) {
                continue;
            }
            if *suffix == "ion" && !matches!(self.at(self.j), b's' | b't') {
                continue;
            }
            if self.m() > 1 {
                self.k = self.j;
            }
            return;
        }
    }

    /// Final -e and -ll.
    fn step5(&mut self) {
        self.j = self.k;
        if self.at(self.k) == b'e' {
            let a = self.m();
            if a > 1 || (a == 1 && !self.cvc(self.k - 1)) {
                self.k -= 1;
            }
        }
        if self.at(self.k) == b'l' && self.double_c(self.k) && self.m() > 1 {
            self.k -= 1;
        }
    }
}
