// https://docs.microsoft.com/en-us/typography/opentype/spec/name

use crate::parser::{FromData, LazyArray16, Stream};

/// A name record.
#[derive(Clone, Copy, Debug)]
pub struct Name<'a> {
    /// Platform ID.
    pub platform_id: u16,

    /// Platform-specific encoding ID.
    pub encoding_id: u16,

    /// Language ID.
    pub language_id: u16,

    /// Name ID: 1 is the family, 2 the subfamily, 16/17 their
    /// typographic variants.
    pub name_id: u16,

    /// Raw string data. UTF-16BE for Windows and Unicode platforms.
    pub name: &'a [u8],
}

#[derive(Clone, Copy, Debug)]
struct NameRecord {
    platform_id: u16,
    encoding_id: u16,
    language_id: u16,
    name_id: u16,
    length: u16,
    offset: u16,
}

impl FromData for NameRecord {
    const SIZE: usize = 12;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(NameRecord {
            platform_id: s.read()?,
            encoding_id: s.read()?,
            language_id: s.read()?,
            name_id: s.read()?,
            length: s.read()?,
            offset: s.read()?,
        })
    }
}

/// An iterator over name records.
#[derive(Clone, Copy, Default, Debug)]
pub struct Names<'a> {
    records: LazyArray16<'a, NameRecord>,
    storage: &'a [u8],
    index: u16,
}

impl<'a> Iterator for Names<'a> {
    type Item = Name<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.get(self.index)?;
        self.index += 1;

        let start = record.offset as usize;
        let end = start + record.length as usize;
        let name = match self.storage.get(start..end) {
            Some(name) => name,
            // A broken record; try the next one.
            None => return self.next(),
        };

        Some(Name {
            platform_id: record.platform_id,
            encoding_id: record.encoding_id,
            language_id: record.language_id,
            name_id: record.name_id,
            name,
        })
    }
}

pub(crate) fn names(data: &[u8]) -> Names {
    parse(data).unwrap_or_default()
}

fn parse(data: &[u8]) -> Option<Names> {
    let mut s = Stream::new(data);
    // Format 1 adds language-tag records after the name records;
    // the explicit storage offset makes both formats read the same.
    let _format: u16 = s.read()?;
    let count: u16 = s.read()?;
    let storage_offset: u16 = s.read()?;
    let records = s.read_array16::<NameRecord>(count)?;
    let storage = data.get(storage_offset as usize..)?;

    Some(Names {
        records,
        storage,
        index: 0,
    })
}

/// Finds the raw string of a record matching all four identifiers.
pub(crate) fn name_string<'a>(
    data: &'a [u8],
    platform_id: u16,
    encoding_id: u16,
    language_id: u16,
    name_id: u16,
) -> Option<&'a [u8]> {
    names(data).find_map(|name| {
        if name.platform_id == platform_id
            && name.encoding_id == encoding_id
            && name.language_id == language_id
            && name.name_id == name_id
        {
            Some(name.name)
        } else {
            None
        }
    })
}

/// Style flags for [`find_matching_font`].
///
/// Matched against the low bits of `head.macStyle`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FontStyle(pub u16);

impl FontStyle {
    /// Match any style; the subfamily name is compared instead.
    pub const DONT_CARE: FontStyle = FontStyle(0);
    /// Bold.
    pub const BOLD: FontStyle = FontStyle(1);
    /// Italic.
    pub const ITALIC: FontStyle = FontStyle(2);
    /// Underscore.
    pub const UNDERSCORE: FontStyle = FontStyle(4);
    /// Explicitly regular: requires all style bits to be clear.
    pub const NONE: FontStyle = FontStyle(8);

    /// Combines two style requirements.
    pub fn union(self, other: FontStyle) -> FontStyle {
        FontStyle(self.0 | other.0)
    }
}

/// Compares a UTF-8 string against UTF-16BE data.
///
/// `true` only when both decode to exactly the same sequence
/// of code points.
pub fn compare_utf8_to_utf16_be(utf8: &str, utf16_be: &[u8]) -> bool {
    utf16_be_prefix_len(utf8, utf16_be) == Some(utf8.len())
}

/// Returns how many bytes of `utf8` the UTF-16BE string covers as
/// a prefix, or `None` when it is not a prefix at all.
fn utf16_be_prefix_len(utf8: &str, utf16_be: &[u8]) -> Option<usize> {
    if utf16_be.len() & 1 == 1 {
        return None;
    }

    let units = utf16_be
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    let mut rest = utf8.as_bytes();
    let mut buf = [0u8; 4];
    for c in core::char::decode_utf16(units) {
        let c = c.ok()?;
        let encoded = c.encode_utf8(&mut buf).as_bytes();
        if !rest.starts_with(encoded) {
            return None;
        }

        rest = &rest[encoded.len()..];
    }

    Some(utf8.len() - rest.len())
}

/// Scans a font buffer, collection or not, for a font with the given
/// family name and style, and returns its index for [`crate::Font::from_data`].
///
/// With a non-zero `style`, the `head.macStyle` bits are checked and only
/// the family name is compared; otherwise the name must match a
/// family/subfamily pair, e.g. `"Arial Bold"`.
pub fn find_matching_font(data: &[u8], name: &str, style: FontStyle) -> Option<u32> {
    let mut index = 0;
    while let Some(offset) = crate::font_offset_for_index(data, index) {
        if matches_font(data, offset, name, style) {
            return Some(index);
        }

        index = index.checked_add(1)?;
    }

    None
}

fn matches_font(data: &[u8], offset: u32, name: &str, style: FontStyle) -> bool {
    if style.0 != 0 {
        let mac_style = match crate::find_table(data, offset, b"head") {
            Some(head) => Stream::read_at::<u16>(head, 44).unwrap_or(0),
            None => return false,
        };

        if mac_style & 7 != style.0 & 7 {
            return false;
        }
    }

    let name_data = match crate::find_table(data, offset, b"name") {
        Some(name_data) => name_data,
        None => return false,
    };

    if style.0 != 0 {
        // The style already matched, so only the family name counts.
        matches_pair(name_data, name, 16, None)
            || matches_pair(name_data, name, 1, None)
            || matches_pair(name_data, name, 3, None)
    } else {
        matches_pair(name_data, name, 16, Some(17))
            || matches_pair(name_data, name, 1, Some(2))
            || matches_pair(name_data, name, 3, None)
    }
}

/// Matches `name` against a record with `target_id`, optionally
/// followed by a subfamily record with `next_id` covering the rest
/// after a space, as in `"Family Subfamily"`.
fn matches_pair(data: &[u8], name: &str, target_id: u16, next_id: Option<u16>) -> bool {
    let names = names(data);
    let records = names.records;

    let mut i = 0u16;
    while let Some(record) = records.get(i) {
        i += 1;

        if record.name_id != target_id || !is_unicode_record(&record) {
            continue;
        }

        let value = match record_string(&names, &record) {
            Some(value) => value,
            None => continue,
        };

        let matched = match utf16_be_prefix_len(name, value) {
            Some(matched) => matched,
            None => continue,
        };

        // A subfamily record directly following, with the same platform,
        // encoding and language, extends the match.
        let follower = next_id.and_then(|next_id| {
            let next = records.get(i)?;
            if next.name_id == next_id
                && next.platform_id == record.platform_id
                && next.encoding_id == record.encoding_id
                && next.language_id == record.language_id
            {
                Some(next)
            } else {
                None
            }
        });

        match follower {
            Some(next) => {
                let next_value = record_string(&names, &next).unwrap_or(&[]);
                if next_value.is_empty() {
                    if matched == name.len() {
                        return true;
                    }
                } else if matched < name.len() && name.as_bytes()[matched] == b' ' {
                    let rest = &name[matched + 1..];
                    if compare_utf8_to_utf16_be(rest, next_value) {
                        return true;
                    }
                }
            }
            None => {
                if matched == name.len() {
                    return true;
                }
            }
        }
    }

    false
}

fn is_unicode_record(record: &NameRecord) -> bool {
    record.platform_id == 0
        || (record.platform_id == 3 && record.encoding_id == 1)
        || (record.platform_id == 3 && record.encoding_id == 10)
}

fn record_string<'a>(names: &Names<'a>, record: &NameRecord) -> Option<&'a [u8]> {
    let start = record.offset as usize;
    names.storage.get(start..start + record.length as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_be(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    fn name_table(entries: &[(u16, &str)]) -> Vec<u8> {
        let count = entries.len() as u16;
        let mut storage = Vec::new();
        let mut records = Vec::new();
        for &(name_id, value) in entries {
            let encoded = utf16_be(value);
            records.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
            records.extend_from_slice(&1u16.to_be_bytes()); // encoding: Unicode BMP
            records.extend_from_slice(&0x409u16.to_be_bytes()); // language: en-US
            records.extend_from_slice(&name_id.to_be_bytes());
            records.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
            records.extend_from_slice(&(storage.len() as u16).to_be_bytes());
            storage.extend_from_slice(&encoded);
        }

        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // format
        data.extend_from_slice(&count.to_be_bytes());
        data.extend_from_slice(&(6 + count * 12).to_be_bytes()); // storage offset
        data.extend_from_slice(&records);
        data.extend_from_slice(&storage);
        data
    }

    #[test]
    fn utf16_compare() {
        assert!(compare_utf8_to_utf16_be("Arial", &utf16_be("Arial")));
        assert!(!compare_utf8_to_utf16_be("Arial", &utf16_be("Aria")));
        assert!(!compare_utf8_to_utf16_be("Aria", &utf16_be("Arial")));
        assert!(compare_utf8_to_utf16_be("Ария", &utf16_be("Ария")));
        // A supplementary-plane character, encoded with surrogates.
        assert!(compare_utf8_to_utf16_be("𝄞", &utf16_be("𝄞")));
        // Odd byte count is never valid UTF-16.
        assert!(!compare_utf8_to_utf16_be("A", &[0x00]));
    }

    #[test]
    fn prefix_len() {
        assert_eq!(utf16_be_prefix_len("Arial Bold", &utf16_be("Arial")), Some(5));
        assert_eq!(utf16_be_prefix_len("Arial", &utf16_be("Bold")), None);
        assert_eq!(utf16_be_prefix_len("Arial", &[]), Some(0));
    }

    #[test]
    fn iterate_names() {
        let data = name_table(&[(1, "Test Family"), (2, "Regular")]);
        let mut names = names(&data);

        let first = names.next().unwrap();
        assert_eq!(first.name_id, 1);
        assert_eq!(first.name, utf16_be("Test Family").as_slice());

        let second = names.next().unwrap();
        assert_eq!(second.name_id, 2);
        assert!(names.next().is_none());
    }

    #[test]
    fn string_lookup() {
        let data = name_table(&[(1, "Test Family")]);
        let expected = utf16_be("Test Family");
        assert_eq!(name_string(&data, 3, 1, 0x409, 1), Some(expected.as_slice()));
        assert_eq!(name_string(&data, 3, 1, 0x409, 2), None);
        assert_eq!(name_string(&data, 1, 0, 0, 1), None);
    }

    #[test]
    fn family_subfamily_pair() {
        let data = name_table(&[(1, "Test Family"), (2, "Bold")]);
        assert!(matches_pair(&data, "Test Family Bold", 1, Some(2)));
        assert!(!matches_pair(&data, "Test Family", 1, Some(2)));
        assert!(!matches_pair(&data, "Test Family Italic", 1, Some(2)));
        assert!(matches_pair(&data, "Test Family", 1, None));
    }
}
