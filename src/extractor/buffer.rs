//! Pending Picture Buffer: decoded pictures held in presentation order
//! until they are delivered or released.

use crate::decoder::DecodedPicture;
use std::collections::VecDeque;

/// Decoded pictures awaiting presentation, ordered by pts.
#[derive(Debug)]
pub struct PendingPictures {
    pictures: VecDeque<DecodedPicture>,
    capacity: usize,
}

impl PendingPictures {
    pub fn new(capacity: usize) -> Self {
        Self {
            pictures: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pictures.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pictures.len() >= self.capacity
    }

    /// Pictures that still fit before the capacity is reached.
    pub fn room(&self) -> usize {
        self.capacity.saturating_sub(self.pictures.len())
    }

    pub fn front_pts(&self) -> Option<i64> {
        self.pictures.front().map(|p| p.pts)
    }

    /// Insert keeping pts order; arrival order breaks ties.
    pub fn insert(&mut self, picture: DecodedPicture) {
        let position = self.pictures.partition_point(|p| p.pts <= picture.pts);
        self.pictures.insert(position, picture);
    }

    pub fn pop_front(&mut self) -> Option<DecodedPicture> {
        self.pictures.pop_front()
    }

    /// Pts of the earliest picture at or after `ticks`.
    pub fn first_at_or_after(&self, ticks: i64) -> Option<i64> {
        self.pictures.iter().map(|p| p.pts).find(|&pts| pts >= ticks)
    }

    /// Release every picture presented before `ticks`.
    pub fn release_below(&mut self, ticks: i64) -> usize {
        let mut released = 0;
        while self.pictures.front().is_some_and(|p| p.pts < ticks) {
            if let Some(picture) = self.pictures.pop_front() {
                picture.release();
                released += 1;
            }
        }
        released
    }

    pub fn release_all(&mut self) -> usize {
        let released = self.pictures.len();
        self.pictures.drain(..).for_each(DecodedPicture::release);
        released
    }
}

impl Drop for PendingPictures {
    fn drop(&mut self) {
        self.release_all();
    }
}
