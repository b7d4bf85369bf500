//! Top-level session facade: one `load` call takes a file path through
//! deciphering, version discovery, block parsing and model extraction.

use std::io::Write;
use std::path::{Path, PathBuf};

use binrw::Endian;

use crate::block::{self, Block};
use crate::error::PtSessionError;
use crate::extract::{self, Extractor};
use crate::legacy;
use crate::model::{AudioFile, CompoundGroup, Region, Track};
use crate::{unxor, version};

/// A fully loaded session. All model data is owned; reloading means
/// building a fresh `Session` and replacing the old value, which swaps
/// every collection at once.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    data: Vec<u8>,
    version: u8,
    endian: Endian,
    product: Option<String>,
    session_rate: i64,
    target_rate: i64,
    blocks: Vec<Block>,
    sources: Vec<AudioFile>,
    regions: Vec<Region>,
    midi_regions: Vec<Region>,
    tracks: Vec<Track>,
    midi_tracks: Vec<Track>,
    compounds: Vec<CompoundGroup>,
}

impl Session {
    /// Load a session file, rescaling all timeline values to `target_rate`.
    pub fn load(path: impl AsRef<Path>, target_rate: i64) -> Result<Session, PtSessionError> {
        let path = path.as_ref();
        let data = unxor::unxor(path)?;

        let info = version::detect(&data)?;
        if !(5..=12).contains(&info.version) {
            return Err(PtSessionError::UnsupportedVersion(info.version));
        }
        log::debug!(
            "{}: version {} ({:?} endian)",
            path.display(),
            info.version,
            info.endian
        );

        let blocks = block::parse_blocks(&data, info.endian);
        if blocks.is_empty() {
            return Err(PtSessionError::Malformed("no blocks past the header"));
        }

        let session_rate = extract::session_rate(&data, &blocks, info.endian)
            .or_else(|| legacy::scan_session_rate(&data, info.version, info.endian))
            .unwrap_or(0) as i64;
        if !(44100..=192000).contains(&session_rate) {
            return Err(PtSessionError::BadSessionRate(session_rate));
        }
        let rate_factor = target_rate as f64 / session_rate as f64;

        let model =
            Extractor::new(&data, info.endian, info.version, rate_factor).run(&blocks);

        Ok(Session {
            path: path.to_owned(),
            data,
            version: info.version,
            endian: info.endian,
            product: info.product,
            session_rate,
            target_rate,
            blocks,
            sources: model.sources,
            regions: model.regions,
            midi_regions: model.midi_regions,
            tracks: model.tracks,
            midi_tracks: model.midi_tracks,
            compounds: model.compounds,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Product string from the header, when the session carries one.
    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn session_rate(&self) -> i64 {
        self.session_rate
    }

    pub fn target_rate(&self) -> i64 {
        self.target_rate
    }

    pub fn sources(&self) -> &[AudioFile] {
        &self.sources
    }

    pub fn audio_regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn midi_regions(&self) -> &[Region] {
        &self.midi_regions
    }

    pub fn audio_tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn midi_tracks(&self) -> &[Track] {
        &self.midi_tracks
    }

    pub fn compounds(&self) -> &[CompoundGroup] {
        &self.compounds
    }

    /// Source lookup by on-disk index.
    pub fn source_by_index(&self, index: u16) -> Option<&AudioFile> {
        self.sources.iter().find(|w| w.index == index)
    }

    /// Source lookup by filename, ASCII case-insensitive.
    pub fn source_by_name(&self, name: &str) -> Option<&AudioFile> {
        self.sources.iter().find(|w| w.name_matches(name))
    }

    /// Render the parsed block tree with hexdumps, the main aid when
    /// puzzling out an unfamiliar session.
    pub fn dump_blocks(&self, w: &mut impl Write) -> std::io::Result<()> {
        for b in &self.blocks {
            block::dump_block(w, &self.data, b, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tests::make_block;
    use crate::extract::ZERO_TICKS;
    use crate::unxor::{XorKey, HEADER_LEN};

    /// Builds plaintext session images block by block, then enciphers them
    /// to disk so tests exercise the full pipeline.
    struct Fixture {
        version: u8,
        xor_type: u8,
        xor_value: u8,
        blocks: Vec<Vec<u8>>,
    }

    impl Fixture {
        fn new(version: u8) -> Fixture {
            Fixture {
                version,
                xor_type: 0x01,
                xor_value: 0x35,
                blocks: Vec::new(),
            }
        }

        fn cipher(mut self, xor_type: u8, xor_value: u8) -> Fixture {
            self.xor_type = xor_type;
            self.xor_value = xor_value;
            self
        }

        fn block(mut self, bytes: Vec<u8>) -> Fixture {
            self.blocks.push(bytes);
            self
        }

        fn plaintext(&self) -> Vec<u8> {
            let mut data = vec![0u8; HEADER_LEN];
            data[0] = 0x03;
            data[0x12] = self.xor_type;
            data[0x13] = self.xor_value;

            // Product segment carrying the version byte.
            let mut payload = vec![0x03, 0x00, 0x00];
            payload.extend_from_slice(&9u32.to_le_bytes());
            payload.extend_from_slice(b"Pro Tools");
            payload.extend_from_slice(&[0x03, 0x00, 0x00, 0x00]);
            payload.push(self.version);
            data.extend_from_slice(&[0x5a, 0x03, 0x00]);
            data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            data.extend_from_slice(&payload);

            for b in &self.blocks {
                data.extend_from_slice(b);
            }
            data
        }

        fn write(&self, dir: &Path, name: &str) -> PathBuf {
            let mut data = self.plaintext();
            if let Ok(key) = XorKey::from_header(self.xor_type, self.xor_value) {
                for i in HEADER_LEN..data.len() {
                    data[i] ^= key.byte_at(i);
                }
            }
            let path = dir.join(name);
            std::fs::write(&path, data).unwrap();
            path
        }
    }

    fn pstring(s: &str) -> Vec<u8> {
        let mut out = (s.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    fn rate_block(rate: u32) -> Vec<u8> {
        let mut rest = vec![0u8; 2];
        rest.extend_from_slice(&rate.to_le_bytes());
        make_block(0x01, 0x1028, &rest)
    }

    fn wav_list_block(names: &[(&str, &[u8; 4])], lengths: &[u64]) -> Vec<u8> {
        let mut entries = vec![0u8; 9];
        for (name, tag) in names {
            entries.extend_from_slice(&pstring(name));
            entries.extend_from_slice(*tag);
            entries.extend_from_slice(&[0u8; 5]);
        }
        let names_child = make_block(0x02, 0x103a, &entries);

        let mut meta_rest = vec![0u8; 1];
        for len in lengths {
            let mut info = vec![0u8; 6];
            info.extend_from_slice(&len.to_le_bytes());
            meta_rest.extend_from_slice(&make_block(0x03, 0x1001, &info));
        }
        let meta_child = make_block(0x02, 0x1003, &meta_rest);

        let mut rest = (names.len() as u32).to_le_bytes().to_vec();
        rest.push(0);
        rest.extend_from_slice(&names_child);
        rest.extend_from_slice(&meta_child);
        make_block(0x01, 0x1004, &rest)
    }

    fn three_point(offset: (u64, u8), length: (u64, u8), start: (u64, u8)) -> Vec<u8> {
        let mut out = vec![0x01, offset.1 << 4, length.1 << 4, start.1 << 4, 0x00];
        for (value, width) in [offset, length, start] {
            out.extend_from_slice(&value.to_le_bytes()[..width as usize]);
        }
        out
    }

    fn region_list_block(
        codes: (u16, u16),
        regions: &[(&str, Vec<u8>, u32)],
    ) -> Vec<u8> {
        let mut rest = vec![0u8; 1];
        for (name, tp, source) in regions {
            let mut entry = vec![0u8; 9];
            entry.extend_from_slice(&pstring(name));
            entry.extend_from_slice(tp);
            entry.extend_from_slice(&make_block(0x02, 0x0000, &[]));
            entry.extend_from_slice(&source.to_le_bytes());
            rest.extend_from_slice(&make_block(0x02, codes.1, &entry));
        }
        make_block(0x01, codes.0, &rest)
    }

    fn track_list_block(tracks: &[(&str, &[u16])]) -> Vec<u8> {
        let mut rest = vec![0u8; 1];
        for (name, channels) in tracks {
            let mut entry = pstring(name);
            entry.push(0);
            entry.extend_from_slice(&(channels.len() as u32).to_le_bytes());
            for ch in *channels {
                entry.extend_from_slice(&ch.to_le_bytes());
            }
            rest.extend_from_slice(&make_block(0x02, 0x1014, &entry));
        }
        make_block(0x01, 0x1015, &rest)
    }

    /// Placement map: one map entry per track lane, each holding one or
    /// more placement records `(region_index, start)`.
    fn placement_map_block(
        codes: (u16, u16, u16, u16),
        lanes: &[(&str, &[(u32, u64)])],
        with_start: bool,
    ) -> Vec<u8> {
        let (map, entry_code, list, placement) = codes;
        let mut rest = vec![0u8; 1];
        for (name, placements) in lanes {
            let mut list_rest = vec![0u8; 1];
            for (raw, start) in *placements {
                let mut p = vec![0u8; 2];
                p.extend_from_slice(&raw.to_le_bytes());
                if with_start {
                    p.push(0);
                    p.extend_from_slice(&start.to_le_bytes()[..5]);
                }
                list_rest.extend_from_slice(&make_block(0x02, placement, &p));
            }
            let list_block = make_block(0x02, list, &list_rest);
            let mut entry = pstring(name);
            entry.extend_from_slice(&list_block);
            rest.extend_from_slice(&make_block(0x02, entry_code, &entry));
        }
        make_block(0x01, map, &rest)
    }

    fn midi_record(pos: u64, note: u8, length: u64, velocity: u8) -> Vec<u8> {
        let mut rec = vec![0u8; 35];
        rec[0..5].copy_from_slice(&pos.to_le_bytes()[..5]);
        rec[8] = note;
        rec[9..14].copy_from_slice(&length.to_le_bytes()[..5]);
        rec[17] = velocity;
        rec
    }

    fn midi_events_block(zero_ticks: u64, records: &[Vec<u8>]) -> Vec<u8> {
        let mut rest = b"MdNLB".to_vec();
        rest.extend_from_slice(&[0u8; 6]);
        rest.extend_from_slice(&(records.len() as u32).to_le_bytes());
        rest.extend_from_slice(&zero_ticks.to_le_bytes()[..5]);
        for r in records {
            rest.extend_from_slice(r);
        }
        make_block(0x01, 0x2000, &rest)
    }

    fn midi_region_list_block(regions: &[(&str, u32)]) -> Vec<u8> {
        let mut rest = vec![0u8; 1];
        for (name, chunk) in regions {
            let mut meta = pstring(name);
            meta.extend_from_slice(&three_point((0, 1), (0, 1), (0, 1)));
            let meta_block = make_block(0x02, 0x1007, &meta);
            let mut entry = vec![0u8; 1];
            entry.extend_from_slice(&meta_block);
            entry.extend_from_slice(&chunk.to_le_bytes());
            rest.extend_from_slice(&make_block(0x02, 0x2001, &entry));
        }
        make_block(0x01, 0x2002, &rest)
    }

    fn midi_track_list_block(names: &[&str]) -> Vec<u8> {
        let mut rest = vec![0u8; 1];
        for name in names {
            let mut entry = vec![0u8; 2];
            entry.extend_from_slice(&pstring(name));
            rest.extend_from_slice(&make_block(0x02, 0x251a, &entry));
        }
        make_block(0x01, 0x2519, &rest)
    }

    fn compound_map_block(groups: &[(&str, u32, &[u32])]) -> Vec<u8> {
        let mut list_rest = vec![0u8; 1];
        for (name, level, members) in groups {
            let mut grp = pstring(name);
            for member in *members {
                let mut el = vec![0u8; 37];
                el.extend_from_slice(&member.to_le_bytes());
                grp.extend_from_slice(&make_block(0x02, 0x2523, &el));
            }
            list_rest.extend_from_slice(&make_block(0x02, 0x2628, &grp));
            // One byte of padding, then the group's region-index offset.
            list_rest.push(0);
            list_rest.extend_from_slice(&level.to_le_bytes());
        }
        let list = make_block(0x02, 0x262b, &list_rest);
        let mut rest = vec![0u8; 1];
        rest.extend_from_slice(&list);
        make_block(0x01, 0x262c, &rest)
    }

    fn load(fixture: Fixture, target_rate: i64) -> Result<Session, PtSessionError> {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture.write(dir.path(), "session.ptx");
        Session::load(path, target_rate)
    }

    #[test]
    fn empty_session_loads() {
        let session = load(Fixture::new(8).block(rate_block(48000)), 48000).unwrap();
        assert_eq!(session.version(), 8);
        assert_eq!(session.session_rate(), 48000);
        assert_eq!(session.product(), Some("Pro Tools"));
        assert!(session.sources().is_empty());
        assert!(session.audio_regions().is_empty());
        assert!(session.midi_regions().is_empty());
        assert!(session.audio_tracks().is_empty());
        assert!(session.midi_tracks().is_empty());
    }

    #[test]
    fn single_source_no_regions() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(wav_list_block(&[("kick.wav", b"WAVE")], &[44100])),
            48000,
        )
        .unwrap();
        assert_eq!(session.sources().len(), 1);
        let wav = &session.sources()[0];
        assert_eq!(wav.filename, "kick.wav");
        assert_eq!(wav.index, 0);
        assert_eq!(wav.length, 44100);
        assert!(session.source_by_name("KICK.WAV").is_some());
        assert!(session.source_by_index(0).is_some());
        assert!(session.source_by_index(1).is_none());
    }

    #[test]
    fn filtered_source_names_are_skipped() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(wav_list_block(
                    &[
                        ("beat.grp", b"WAVE"),
                        ("Audio Files/kick.wav", b"WAVE"),
                        ("kick.wav", b"WAVE"),
                        ("noise.bin", b"JUNK"),
                        ("flute.aif", b"FFIA"),
                    ],
                    &[44100, 200],
                )),
            48000,
        )
        .unwrap();
        let names: Vec<_> = session.sources().iter().map(|w| w.filename.as_str()).collect();
        assert_eq!(names, ["kick.wav", "flute.aif"]);
        assert_eq!(session.sources()[0].index, 0);
        assert_eq!(session.sources()[1].index, 1);
        assert_eq!(session.sources()[0].length, 44100);
        assert_eq!(session.sources()[1].length, 200);
    }

    #[test]
    fn audio_region_placed_on_track() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(44100))
                .block(wav_list_block(&[("kick.wav", b"WAVE")], &[44100]))
                .block(region_list_block(
                    (0x100b, 0x1008),
                    &[("K1", three_point((0, 1), (22050, 3), (0, 1)), 0)],
                ))
                .block(track_list_block(&[("Kick", &[0])]))
                .block(placement_map_block(
                    (0x1012, 0x1011, 0x100f, 0x100e),
                    &[("K1", &[(0, 0)])],
                    false,
                )),
            48000,
        )
        .unwrap();

        assert_eq!(session.audio_regions().len(), 1);
        let region = &session.audio_regions()[0];
        assert_eq!(region.name, "K1");
        assert_eq!(region.length, 24000);
        assert_eq!(region.source, Some(0));

        assert_eq!(session.audio_tracks().len(), 1);
        let track = &session.audio_tracks()[0];
        assert_eq!(track.name, "Kick");
        assert_eq!(track.index, 0);
        let placed = track.region.as_ref().unwrap();
        assert_eq!(placed.name, "K1");
        assert_eq!(placed.length, 24000);
    }

    #[test]
    fn second_placement_fans_out_the_track() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(wav_list_block(&[("kick.wav", b"WAVE")], &[48000]))
                .block(region_list_block(
                    (0x100b, 0x1008),
                    &[
                        ("K1", three_point((0, 1), (100, 1), (0, 1)), 0),
                        ("K2", three_point((0, 1), (200, 1), (0, 1)), 0),
                    ],
                ))
                .block(track_list_block(&[("Kick", &[0])]))
                .block(placement_map_block(
                    (0x1012, 0x1011, 0x100f, 0x100e),
                    &[("K1", &[(0, 0), (1, 0)])],
                    false,
                )),
            48000,
        )
        .unwrap();

        assert_eq!(session.audio_tracks().len(), 2);
        let names: Vec<_> = session
            .audio_tracks()
            .iter()
            .map(|t| t.region.as_ref().unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["K1", "K2"]);
        assert!(session
            .audio_tracks()
            .iter()
            .all(|t| t.name == "Kick" && t.index == 0));
    }

    #[test]
    fn newer_dialect_places_with_start() {
        let session = load(
            Fixture::new(10)
                .block(rate_block(48000))
                .block(wav_list_block(&[("kick.wav", b"WAVE")], &[48000]))
                .block(region_list_block(
                    (0x262a, 0x2629),
                    &[("K1", three_point((0, 1), (4800, 2), (0, 1)), 0)],
                ))
                .block(track_list_block(&[("Kick", &[0])]))
                .block(placement_map_block(
                    (0x1054, 0x1052, 0x1050, 0x104f),
                    &[("K1", &[(0, 9600)])],
                    true,
                )),
            48000,
        )
        .unwrap();

        let track = &session.audio_tracks()[0];
        let placed = track.region.as_ref().unwrap();
        assert_eq!(placed.start_pos, 9600);
        assert_eq!(placed.length, 4800);
    }

    #[test]
    fn midi_region_with_two_notes() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(midi_events_block(
                    ZERO_TICKS,
                    &[
                        midi_record(ZERO_TICKS, 60, 480, 100),
                        midi_record(ZERO_TICKS + 0x200, 64, 480, 100),
                    ],
                ))
                .block(midi_region_list_block(&[("Bar1", 0)])),
            48000,
        )
        .unwrap();

        assert_eq!(session.midi_regions().len(), 1);
        let region = &session.midi_regions()[0];
        assert_eq!(region.name, "Bar1");
        assert_eq!(region.start_pos, ZERO_TICKS as i64);
        assert_eq!(region.midi.len(), 2);
        assert_eq!(region.midi[0].pos, 0);
        assert_eq!(region.midi[0].note, 60);
        assert_eq!(region.midi[1].pos, 0x200);
        assert_eq!(region.midi[1].note, 64);
        assert_eq!(region.length, 0x200 + 480);
    }

    #[test]
    fn midi_region_placed_on_midi_track() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(midi_events_block(
                    ZERO_TICKS,
                    &[midi_record(ZERO_TICKS, 60, 480, 100)],
                ))
                .block(midi_region_list_block(&[("Bar1", 0)]))
                .block(midi_track_list_block(&["Keys", "Unused"]))
                .block(placement_map_block(
                    (0x1058, 0x1057, 0x1056, 0x104f),
                    &[("Bar1", &[(0, ZERO_TICKS + 960)])],
                    true,
                )),
            48000,
        )
        .unwrap();

        // The lane that never got a region is pruned.
        assert_eq!(session.midi_tracks().len(), 1);
        let track = &session.midi_tracks()[0];
        assert_eq!(track.name, "Keys");
        assert_eq!(track.index, 0);
        let placed = track.region.as_ref().unwrap();
        assert_eq!(placed.start_pos, 960);
        assert_eq!(placed.midi.len(), 1);
    }

    #[test]
    fn midi_placement_start_may_precede_zero_ticks() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(midi_events_block(
                    ZERO_TICKS,
                    &[midi_record(ZERO_TICKS, 60, 480, 100)],
                ))
                .block(midi_region_list_block(&[("Bar1", 0)]))
                .block(midi_track_list_block(&["Keys"]))
                .block(placement_map_block(
                    (0x1058, 0x1057, 0x1056, 0x104f),
                    &[("Bar1", &[(0, ZERO_TICKS - 240)])],
                    true,
                )),
            48000,
        )
        .unwrap();

        let placed = session.midi_tracks()[0].region.as_ref().unwrap();
        assert_eq!(placed.start_pos, 240);
    }

    #[test]
    fn compound_groups_are_reported() {
        let session = load(
            Fixture::new(11)
                .block(rate_block(48000))
                .block(compound_map_block(&[("Verse", 2, &[0]), ("Chorus", 0, &[])])),
            48000,
        )
        .unwrap();

        assert_eq!(session.compounds().len(), 2);
        let verse = &session.compounds()[0];
        assert_eq!(verse.name, "Verse");
        assert_eq!(verse.index, 0);
        assert_eq!(verse.level, 2);
        assert!(!verse.root);
        let chorus = &session.compounds()[1];
        assert_eq!(chorus.name, "Chorus");
        assert_eq!(chorus.next_index, 1);
        assert!(chorus.root);
    }

    #[test]
    fn compound_groups_ignored_before_v10() {
        let session = load(
            Fixture::new(9)
                .block(rate_block(48000))
                .block(compound_map_block(&[("Verse", 0, &[])])),
            48000,
        )
        .unwrap();
        assert!(session.compounds().is_empty());
    }

    #[test]
    fn legacy_rate_marker_is_scanned() {
        let mut marker = b"\x5a\x00\x02".to_vec();
        marker.extend_from_slice(&[0u8; 9]);
        marker.extend_from_slice(&88200u32.to_le_bytes()[..3]);
        let session = load(
            Fixture::new(5).block(vec![0u8; 0x100]).block(marker),
            48000,
        )
        .unwrap();
        assert_eq!(session.session_rate(), 88200);
    }

    #[test]
    fn invalid_session_rate_is_rejected() {
        let err = load(Fixture::new(8).block(rate_block(30000)), 48000).unwrap_err();
        assert!(matches!(err, PtSessionError::BadSessionRate(30000)));
    }

    #[test]
    fn session_rate_bounds_are_inclusive() {
        assert!(load(Fixture::new(8).block(rate_block(44100)), 48000).is_ok());
        assert!(load(Fixture::new(8).block(rate_block(192000)), 48000).is_ok());
        assert!(matches!(
            load(Fixture::new(8).block(rate_block(44099)), 48000),
            Err(PtSessionError::BadSessionRate(44099))
        ));
        assert!(matches!(
            load(Fixture::new(8).block(rate_block(192001)), 48000),
            Err(PtSessionError::BadSessionRate(192001))
        ));
    }

    #[test]
    fn unknown_cipher_is_rejected() {
        let err = load(
            Fixture::new(8).cipher(0x07, 0x35).block(rate_block(48000)),
            48000,
        )
        .unwrap_err();
        assert!(matches!(err, PtSessionError::UnknownCipher(0x07)));
    }

    #[test]
    fn header_only_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.ptx");
        let mut header = vec![0u8; HEADER_LEN];
        header[0] = 0x03;
        header[0x12] = 0x01;
        header[0x13] = 0x35;
        std::fs::write(&path, header).unwrap();
        assert!(matches!(
            Session::load(path, 48000),
            Err(PtSessionError::Malformed(_))
        ));
    }

    #[test]
    fn out_of_range_version_is_rejected() {
        let err = load(Fixture::new(4).block(rate_block(48000)), 48000).unwrap_err();
        assert!(matches!(err, PtSessionError::UnsupportedVersion(4)));
        let err = load(Fixture::new(13).block(rate_block(48000)), 48000).unwrap_err();
        assert!(matches!(err, PtSessionError::UnsupportedVersion(13)));
    }

    #[test]
    fn missing_file_is_file_open() {
        assert!(matches!(
            Session::load("/nonexistent/session.ptx", 48000),
            Err(PtSessionError::FileOpen(..))
        ));
    }

    #[test]
    fn event_totals_match_region_events() {
        let session = load(
            Fixture::new(8)
                .block(rate_block(48000))
                .block(midi_events_block(
                    ZERO_TICKS,
                    &[
                        midi_record(ZERO_TICKS, 60, 480, 100),
                        midi_record(ZERO_TICKS + 480, 62, 480, 90),
                        midi_record(ZERO_TICKS + 960, 64, 480, 80),
                    ],
                ))
                .block(midi_region_list_block(&[("Bar1", 0)])),
            48000,
        )
        .unwrap();

        let total: usize = session.midi_regions().iter().map(|r| r.midi.len()).sum();
        assert_eq!(total, 3);
        for region in session.midi_regions() {
            for ev in &region.midi {
                assert!(ev.note <= 127);
                assert!(ev.velocity <= 127);
            }
        }
    }

    #[test]
    fn block_dump_describes_content() {
        let session = load(Fixture::new(8).block(rate_block(48000)), 48000).unwrap();
        let mut out = Vec::new();
        session.dump_blocks(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("INFO sample rate"));
    }
}
