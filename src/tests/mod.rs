use time::{macros::datetime, PrimitiveDateTime};

use crate::{
    connection::{Command, Replay, ReplayError},
    history::{Crc16, Cutoff, HistoryRecord, RecordInfo, PAGE_SIZE},
    DecodeError, HistoryIter, Pump, PumpError, StreamState,
};


fn stamp(t: PrimitiveDateTime) -> [u8; 5] {
    let month = u8::from(t.month());
    [
        ((month >> 2) << 6) | t.second(),
        ((month & 0x3) << 6) | t.minute(),
        t.hour(),
        t.day(),
        (t.year() - 2000) as u8,
    ]
}

fn suspend(t: PrimitiveDateTime) -> Vec<u8> {
    let mut data = vec![0x1E, 0];
    data.extend_from_slice(&stamp(t));
    data
}

/// A full page holding a suspend record for each of `times`, in the order
/// the pump would have written them (oldest first).
fn page(times: &[PrimitiveDateTime]) -> Vec<u8> {
    let mut data: Vec<u8> = times.iter().rev().flat_map(|t| suspend(*t)).collect();
    data.resize(PAGE_SIZE - 2, 0);
    let crc = Crc16::from_iter(data.iter().copied());
    data.extend_from_slice(&crc.to_be_bytes());
    data
}

fn times(records: &[HistoryRecord]) -> Vec<PrimitiveDateTime> {
    records.iter().filter_map(|r| r.time).collect()
}

const MODEL_523: [u8; 4] = [3, b'5', b'2', b'3'];

fn five_pages() -> Replay {
    Replay::new()
        .with_response(Command::Model, MODEL_523)
        .with_page(page(&[datetime!(2024-03-01 12:00), datetime!(2024-03-01 11:00)]))
        .with_page(page(&[datetime!(2024-03-01 10:00), datetime!(2024-03-01 09:00)]))
        .with_page(page(&[datetime!(2024-03-01 08:00), datetime!(2024-03-01 07:00)]))
        .with_page(page(&[datetime!(2024-03-01 06:00), datetime!(2024-03-01 05:00)]))
        .with_page(page(&[datetime!(2024-03-01 04:00)]))
}

#[test]
fn read_all_history() {
    let mut pump = Pump::new(five_pages());

    let records: Vec<_> = pump
        .history(Cutoff::All)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 9);
    assert!(records.iter().all(|r| r.info == RecordInfo::SuspendPump));
    assert!(times(&records).windows(2).all(|w| w[0] > w[1]));
    assert_eq!(pump.release().fetched_pages(), &[0, 1, 2, 3, 4]);
}

#[test]
fn cutoff_stops_within_page() {
    let mut replay = five_pages();
    let mut iter = HistoryIter::new(
        &mut replay,
        5,
        true,
        Cutoff::Since(datetime!(2024-03-01 07:30)),
    );

    let records: Vec<_> = iter.by_ref().collect::<Result<_, _>>().unwrap();

    assert_eq!(
        times(&records),
        vec![
            datetime!(2024-03-01 12:00),
            datetime!(2024-03-01 11:00),
            datetime!(2024-03-01 10:00),
            datetime!(2024-03-01 09:00),
            datetime!(2024-03-01 08:00),
        ]
    );
    assert_eq!(iter.state(), StreamState::CutoffReached);
    assert!(iter.next().is_none());
    assert_eq!(replay.fetched_pages(), &[0, 1, 2]);
}

#[test]
fn cutoff_on_page_boundary_fetches_no_further() {
    let mut replay = five_pages();
    let iter = HistoryIter::new(
        &mut replay,
        5,
        true,
        Cutoff::Since(datetime!(2024-03-01 09:00)),
    );

    let records: Vec<_> = iter.collect::<Result<_, _>>().unwrap();

    assert_eq!(records.len(), 4);
    // Page 2 must be read to find the first record older than the cutoff.
    assert_eq!(replay.fetched_pages(), &[0, 1, 2]);
}

#[test]
fn records_without_time_do_not_stop_the_stream() {
    let mut data = suspend(datetime!(2024-03-01 06:00));
    data.extend([0x5C, 2]);
    data.extend(suspend(datetime!(2024-03-01 12:00)));

    let mut replay = Replay::new().with_page(data);
    let records: Vec<_> = HistoryIter::new(
        &mut replay,
        1,
        true,
        Cutoff::Since(datetime!(2024-03-01 08:00)),
    )
    .collect::<Result<_, _>>()
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].time, Some(datetime!(2024-03-01 12:00)));
    assert_eq!(records[1].time, None);
}

#[test]
fn decode_error_on_page_two_of_five() {
    let mut broken = page(&[datetime!(2024-03-01 08:00)]);
    broken[7] = 0xEE;
    let crc = Crc16::from_iter(broken[..PAGE_SIZE - 2].iter().copied());
    broken[PAGE_SIZE - 2..].copy_from_slice(&crc.to_be_bytes());

    let mut replay = Replay::new()
        .with_page(page(&[datetime!(2024-03-01 12:00)]))
        .with_page(page(&[datetime!(2024-03-01 10:00)]))
        .with_page(broken)
        .with_page(page(&[datetime!(2024-03-01 06:00)]))
        .with_page(page(&[datetime!(2024-03-01 04:00)]));

    let mut iter = HistoryIter::new(&mut replay, 5, true, Cutoff::All);

    let mut kept = Vec::new();
    let mut error = None;
    for item in iter.by_ref() {
        match item {
            Ok(record) => kept.push(record),
            Err(e) => error = Some(e),
        }
    }

    assert_eq!(
        times(&kept),
        vec![datetime!(2024-03-01 12:00), datetime!(2024-03-01 10:00)]
    );
    assert_eq!(
        error,
        Some(PumpError::History {
            page: 2,
            error: DecodeError::UnknownRecordType { ty: 0xEE, offset: 7 }
        })
    );
    assert_eq!(iter.state(), StreamState::Failed);
    assert!(iter.next().is_none());
    assert_eq!(replay.fetched_pages(), &[0, 1, 2]);
}

#[test]
fn transport_failure_ends_the_stream() {
    let mut replay = Replay::new()
        .with_page(page(&[datetime!(2024-03-01 12:00)]))
        .with_failed_page()
        .with_page(page(&[datetime!(2024-03-01 08:00)]));

    let items: Vec<_> = HistoryIter::new(&mut replay, 3, true, Cutoff::All).collect();

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(
        items[1],
        Err(PumpError::Connection(ReplayError::PageFailed(1)))
    );
    assert_eq!(replay.fetched_pages(), &[0, 1]);
}

#[test]
fn bad_crc_is_reported() {
    let mut data = page(&[datetime!(2024-03-01 12:00)]);
    data[PAGE_SIZE - 1] ^= 0xFF;

    let mut replay = Replay::new().with_page(data);
    let mut iter = HistoryIter::new(&mut replay, 1, true, Cutoff::All);

    assert!(matches!(
        iter.next(),
        Some(Err(PumpError::History {
            page: 0,
            error: DecodeError::BadCrc { .. }
        }))
    ));
    assert!(iter.next().is_none());
}

#[test]
fn empty_history_is_exhausted() {
    let mut replay = Replay::new();
    let mut iter = HistoryIter::new(&mut replay, 0, true, Cutoff::All);

    assert!(iter.next().is_none());
    assert_eq!(iter.state(), StreamState::Exhausted);
    assert_eq!(iter.pages_read(), 0);
}

#[test]
fn history_requires_model() {
    let mut pump = Pump::new(Replay::new().with_page(page(&[])));

    assert_eq!(
        pump.history(Cutoff::All).err(),
        Some(PumpError::Connection(ReplayError::MissingResponse(
            Command::Model
        )))
    );

    let mut pump = Pump::new(Replay::new().with_response(Command::Model, [2, b'5', b'x']));
    assert!(matches!(
        pump.history(Cutoff::All),
        Err(PumpError::Decode {
            command: Command::Model,
            error: DecodeError::InvalidModel
        })
    ));

    let mut pump = Pump::new(Replay::new().with_response(Command::Model, [3, b'5', b'2']));
    assert!(matches!(
        pump.history(Cutoff::All),
        Err(PumpError::Decode {
            command: Command::Model,
            error: DecodeError::NotEnoughData {
                needed: 4,
                available: 3
            }
        })
    ));
}
