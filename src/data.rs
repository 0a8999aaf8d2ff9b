use rkyv::{Archive, Serialize};

pub type StringId = u32;
#[allow(dead_code)]
pub type ArchivedStringId = <StringId as Archive>::Archived;

#[derive(Archive, Serialize, Debug)]
pub struct EntryRecord {
    pub entry_id: u32,
    pub word: StringId,
    pub ipa: StringId,
    pub morph: Option<StringId>,
}

#[derive(Archive, Serialize, Debug)]
pub struct PackedStrings {
    pub offsets: Vec<u32>,
    pub lengths: Vec<u32>,
    pub data: Vec<u8>,
}

#[derive(Archive, Serialize, Debug)]
pub struct LexiconStore {
    pub strings: PackedStrings,
    pub entries: Vec<EntryRecord>,
}
