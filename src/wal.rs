use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Frame overhead per record: length prefix + trailing CRC.
const FRAME_OVERHEAD: u64 = 8;

fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read one frame. `Ok(None)` on a clean end, a torn frame, a CRC mismatch or
/// an undecodable payload. Everything from there on is discarded.
fn read_frame(reader: &mut impl Read) -> io::Result<Option<(Event, u64)>> {
    let mut len_buf = [0u8; 4];
    if !read_exact_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    if !read_exact_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    let mut crc_buf = [0u8; 4];
    if !read_exact_or_eof(reader, &mut crc_buf)? {
        return Ok(None);
    }
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    match bincode::deserialize::<Event>(&payload) {
        Ok(event) => Ok(Some((event, len as u64 + FRAME_OVERHEAD))),
        Err(_) => Ok(None),
    }
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Events recovered from a log, plus the byte length of its valid prefix.
#[derive(Debug, Default)]
pub struct Replay {
    pub events: Vec<Event>,
    pub valid_len: u64,
}

/// Append-only reservation log.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`, little endian.
/// A torn or corrupt tail (crash mid-write) is cut off when the log is opened,
/// so new appends never land behind garbage.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the log at `path`, truncating any invalid tail.
    pub fn open(path: &Path) -> io::Result<Self> {
        let replay = Self::replay(path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        if file.metadata()?.len() > replay.valid_len {
            tracing::warn!(
                "truncating {} to {} bytes: invalid tail",
                path.display(),
                replay.valid_len
            );
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }
        drop(file);
        Self::open_append(path)
    }

    fn open_append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        })
    }

    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Buffer an event. Nothing is durable until `flush_sync`.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replace the log with `events`: write a temp file, fsync, rename over
    /// the log, reopen for append.
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for event in events {
                encode_event(&mut writer, event)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        *self = Self::open_append(&self.path)?;
        Ok(())
    }

    /// Read every valid event from the log at `path`. A missing file is an
    /// empty log.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();
        while let Some((event, frame_len)) = read_frame(&mut reader)? {
            replay.events.push(event);
            replay.valid_len += frame_len;
        }
        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("foodslot_test_wal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn created(vendor: &str, day: u32) -> Event {
        Event::ReservationCreated {
            id: Ulid::new(),
            vendor: vendor.into(),
            instant: NaiveDate::from_ymd_opt(2021, 2, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let events = vec![created("FT1", 1), created("FT2", 2)];
        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append(e).unwrap();
            }
        }
        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, events);
        assert_eq!(replay.valid_len, fs::metadata(&path).unwrap().len());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        let replay = Wal::replay(&path).unwrap();
        assert!(replay.events.is_empty());
        assert_eq!(replay.valid_len, 0);
    }

    #[test]
    fn replay_discards_torn_tail() {
        let path = tmp_path("torn_tail.wal");
        let event = created("FT1", 1);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&event).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0u8; 6]).unwrap();
        }
        let replay = Wal::replay(&path).unwrap();
        assert_eq!(replay.events, vec![event]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_stops_at_bad_crc() {
        let path = tmp_path("bad_crc.wal");
        let event = Event::ReservationDeleted { id: Ulid::new() };
        {
            let payload = bincode::serialize(&event).unwrap();
            let mut f = File::create(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }
        assert!(Wal::replay(&path).unwrap().events.is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn open_truncates_tail_so_appends_stay_readable() {
        let path = tmp_path("truncate_on_open.wal");
        let first = created("FT1", 1);
        let second = created("FT2", 2);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&first).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[7u8; 5]).unwrap();
        }
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&second).unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap().events, vec![first, second]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_shrinks_and_resets_counter() {
        let path = tmp_path("compact.wal");
        let keep = created("FT1", 1);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&keep).unwrap();
            for day in 2..6 {
                let churn = created("FT2", day);
                let id = match &churn {
                    Event::ReservationCreated { id, .. } => *id,
                    Event::ReservationDeleted { .. } => unreachable!(),
                };
                wal.append(&churn).unwrap();
                wal.append(&Event::ReservationDeleted { id }).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 9);

            let before = fs::metadata(&path).unwrap().len();
            wal.compact(std::slice::from_ref(&keep)).unwrap();
            let after = fs::metadata(&path).unwrap().len();
            assert!(after < before, "compacted log should be smaller: {after} < {before}");
            assert_eq!(wal.appends_since_compact(), 0);

            let next = created("FT3", 3);
            wal.append(&next).unwrap();
            assert_eq!(Wal::replay(&path).unwrap().events, vec![keep.clone(), next]);
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn buffered_appends_are_durable_after_flush() {
        let path = tmp_path("buffered_flush.wal");
        let events: Vec<Event> = (1..6).map(|d| created("FT1", d)).collect();
        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append_buffered(e).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 5);
            wal.flush_sync().unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap().events, events);
        let _ = fs::remove_file(&path);
    }
}
