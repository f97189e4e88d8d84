// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! In-chunk message iteration.
//!
//! A chunk carries one pre-sorted `(time, offset)` index list per
//! connection. The iterator k-way merges those lists with a min-heap so
//! messages come out in non-decreasing time order, filtered by an allowed
//! connection set and a `[start, end]` time window. Ties break by the
//! connection's position in the index list order, then by entry order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::core::{Result, Time};

use super::reader::ChunkPayload;
use super::record::{frame_expected, IndexEntry, MessageData, OP_MESSAGE_DATA};

/// Heap key: earliest front time wins, then lowest list position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
    time: Time,
    list: usize,
}

/// Single-pass, time-ordered iterator over a chunk's messages.
pub struct ChunkMessageIter<'a> {
    data: &'a [u8],
    lists: Vec<&'a [IndexEntry]>,
    cursors: Vec<usize>,
    heap: BinaryHeap<Reverse<HeapKey>>,
    end: Time,
    done: bool,
}

/// Iterate a loaded chunk's messages within `[start, end]`.
///
/// `allowed` restricts output to the given connection ids; `None` means
/// every connection present in the chunk.
pub fn read_chunk_messages<'a>(
    payload: &'a ChunkPayload,
    allowed: Option<&HashSet<u32>>,
    start: Time,
    end: Time,
) -> ChunkMessageIter<'a> {
    let lists: Vec<&[IndexEntry]> = payload
        .indices
        .iter()
        .filter(|index| allowed.map_or(true, |set| set.contains(&index.conn)))
        .map(|index| index.entries.as_slice())
        .collect();

    let mut cursors = vec![0usize; lists.len()];
    let mut heap = BinaryHeap::with_capacity(lists.len());
    for (list, entries) in lists.iter().enumerate() {
        // Entries are pre-sorted by time; skip everything before the window.
        let first = entries.partition_point(|e| e.time < start);
        cursors[list] = first;
        if first < entries.len() {
            heap.push(Reverse(HeapKey {
                time: entries[first].time,
                list,
            }));
        }
    }

    ChunkMessageIter {
        data: &payload.data,
        lists,
        cursors,
        heap,
        end,
        done: false,
    }
}

impl<'a> Iterator for ChunkMessageIter<'a> {
    type Item = Result<MessageData<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Reverse(key) = self.heap.pop()?;
        if key.time > self.end {
            self.done = true;
            self.heap.clear();
            return None;
        }

        let list = key.list;
        let entry = self.lists[list][self.cursors[list]];
        self.cursors[list] += 1;
        if self.cursors[list] < self.lists[list].len() {
            self.heap.push(Reverse(HeapKey {
                time: self.lists[list][self.cursors[list]].time,
                list,
            }));
        }

        let result = frame_expected(
            &self.data[(entry.offset as usize).min(self.data.len())..],
            entry.offset as u64,
            OP_MESSAGE_DATA,
        )
        .and_then(|record| MessageData::from_record(&record));

        match result {
            Ok(message) => Some(Ok(message)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
