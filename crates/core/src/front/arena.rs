//! Index-addressed marker arena backing the fire front.
//!
//! Markers live in a slot vector with an explicit free list; each marker
//! carries `next`/`prev` arena indices forming closed loops. All topological
//! edits (midpoint insertion, neighbor merging, pinch excision, loop
//! retirement) happen here so the front itself only reasons about geometry.

use crate::core_types::Vec2;

/// One point on the perimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Vec2,
    pub velocity: Vec2,
    pub arrival_time: f64,
    pub(crate) next: usize,
    pub(crate) prev: usize,
    pub(crate) loop_id: u32,
}

/// Bookkeeping for one closed loop of markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontLoop {
    pub id: u32,
    pub head: usize,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct MarkerArena {
    slots: Vec<Option<Marker>>,
    free: Vec<usize>,
    loops: Vec<FrontLoop>,
    next_loop_id: u32,
}

impl MarkerArena {
    pub fn get(&self, id: usize) -> Option<&Marker> {
        self.slots.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Marker> {
        self.slots.get_mut(id)?.as_mut()
    }

    pub fn live_count(&self) -> usize {
        self.loops.iter().map(|l| l.len).sum()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &Marker)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|m| (id, m)))
    }

    fn alloc(&mut self, marker: Marker) -> usize {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(marker);
            id
        } else {
            self.slots.push(Some(marker));
            self.slots.len() - 1
        }
    }

    /// Create a new closed loop from ordered vertices. Caller guarantees at
    /// least three vertices in clockwise order.
    pub fn add_loop(&mut self, vertices: &[Vec2], t0: f64) -> u32 {
        let loop_id = self.next_loop_id;
        self.next_loop_id += 1;

        let n = vertices.len();
        let ids: Vec<usize> = vertices
            .iter()
            .map(|&position| {
                self.alloc(Marker {
                    position,
                    velocity: Vec2::zeros(),
                    arrival_time: t0,
                    next: usize::MAX,
                    prev: usize::MAX,
                    loop_id,
                })
            })
            .collect();

        for k in 0..n {
            let id = ids[k];
            let next = ids[(k + 1) % n];
            let prev = ids[(k + n - 1) % n];
            if let Some(m) = self.get_mut(id) {
                m.next = next;
                m.prev = prev;
            }
        }

        self.loops.push(FrontLoop {
            id: loop_id,
            head: ids[0],
            len: n,
        });
        loop_id
    }

    /// Ordered member ids for every loop.
    pub fn loop_members(&self) -> Vec<Vec<usize>> {
        self.loops
            .iter()
            .map(|l| {
                let mut members = Vec::with_capacity(l.len);
                let mut id = l.head;
                for _ in 0..l.len {
                    members.push(id);
                    id = match self.get(id) {
                        Some(m) => m.next,
                        None => break,
                    };
                }
                members
            })
            .collect()
    }

    /// Outward normal at a live marker.
    ///
    /// Loops are clockwise, so the outward direction is the neighbor tangent
    /// rotated by +90 degrees.
    pub fn outward_normal(&self, id: usize) -> Vec2 {
        let Some(m) = self.get(id) else {
            return Vec2::zeros();
        };
        let (Some(prev), Some(next)) = (self.get(m.prev), self.get(m.next)) else {
            return Vec2::zeros();
        };
        let tangent = next.position - prev.position;
        let norm = tangent.norm();
        if norm < 1e-12 {
            return Vec2::zeros();
        }
        Vec2::new(-tangent.y, tangent.x) / norm
    }

    /// Unlink and drop one marker, keeping its loop consistent.
    fn remove_marker(&mut self, id: usize) {
        let Some(marker) = self.slots.get_mut(id).and_then(Option::take) else {
            return;
        };
        self.free.push(id);

        let loop_idx = self.loops.iter().position(|l| l.id == marker.loop_id);
        let Some(loop_idx) = loop_idx else {
            return;
        };

        if marker.next == id {
            // Last marker of its loop
            self.loops.swap_remove(loop_idx);
            return;
        }

        if let Some(p) = self.get_mut(marker.prev) {
            p.next = marker.next;
        }
        if let Some(n) = self.get_mut(marker.next) {
            n.prev = marker.prev;
        }

        let l = &mut self.loops[loop_idx];
        l.len -= 1;
        if l.head == id {
            l.head = marker.next;
        }
    }

    fn insert_after(&mut self, id: usize, mut marker: Marker) {
        let Some(anchor) = self.get(id) else {
            return;
        };
        let next_id = anchor.next;
        marker.prev = id;
        marker.next = next_id;
        marker.loop_id = anchor.loop_id;
        let loop_id = anchor.loop_id;

        let new_id = self.alloc(marker);
        if let Some(a) = self.get_mut(id) {
            a.next = new_id;
        }
        if let Some(n) = self.get_mut(next_id) {
            n.prev = new_id;
        }
        if let Some(l) = self.loops.iter_mut().find(|l| l.id == loop_id) {
            l.len += 1;
        }
    }

    /// Insert a midpoint marker into every segment longer than `resolution`.
    ///
    /// One subdivision per segment per call; spacing converges over steps.
    pub fn insert_midpoints(&mut self, resolution: f64, now: f64) {
        for members in self.loop_members() {
            for &a in &members {
                let Some(ma) = self.get(a) else { continue };
                let b = ma.next;
                let Some(mb) = self.get(b) else { continue };
                if (mb.position - ma.position).norm() > resolution {
                    let midpoint = Marker {
                        position: (ma.position + mb.position) * 0.5,
                        velocity: (ma.velocity + mb.velocity) * 0.5,
                        arrival_time: now,
                        next: usize::MAX,
                        prev: usize::MAX,
                        loop_id: ma.loop_id,
                    };
                    self.insert_after(a, midpoint);
                }
            }
        }
    }

    /// Remove the follower of every marker pair that collapsed together.
    pub fn merge_close_neighbors(&mut self, merge_dist: f64) {
        for members in self.loop_members() {
            for &a in &members {
                let Some(ma) = self.get(a) else { continue };
                let b = ma.next;
                if b == a {
                    continue;
                }
                let Some(mb) = self.get(b) else { continue };
                if (mb.position - ma.position).norm() < merge_dist {
                    self.remove_marker(b);
                }
            }
        }
    }

    /// Excise pinched sub-loops.
    ///
    /// When two non-adjacent markers of the same loop come closer than
    /// `merge_dist` the loop has crossed itself; the shorter arc between them
    /// is dropped and the two markers are reconnected. One excision per loop
    /// per call.
    pub fn excise_pinches(&mut self, merge_dist: f64) {
        for members in self.loop_members() {
            let n = members.len();
            if n < 5 {
                continue;
            }
            let positions: Vec<Vec2> = members
                .iter()
                .map(|&id| self.get(id).map_or(Vec2::zeros(), |m| m.position))
                .collect();

            let mut pinch = None;
            'search: for i in 0..n {
                for j in (i + 2)..n {
                    // Skip wrap-around adjacency
                    if i == 0 && j == n - 1 {
                        continue;
                    }
                    if (positions[j] - positions[i]).norm() < merge_dist {
                        pinch = Some((i, j));
                        break 'search;
                    }
                }
            }

            let Some((i, j)) = pinch else { continue };
            let inner = j - i - 1;
            let outer = n - (j - i) - 1;

            if inner <= outer {
                // Drop members strictly between i and j, reconnect i -> j
                for &id in &members[i + 1..j] {
                    self.remove_marker(id);
                }
                if let Some(m) = self.get_mut(members[i]) {
                    m.next = members[j];
                }
                if let Some(m) = self.get_mut(members[j]) {
                    m.prev = members[i];
                }
            } else {
                // Drop the wrapping arc, reconnect j -> i
                for &id in members[j + 1..].iter().chain(&members[..i]) {
                    self.remove_marker(id);
                }
                if let Some(m) = self.get_mut(members[j]) {
                    m.next = members[i];
                }
                if let Some(m) = self.get_mut(members[i]) {
                    m.prev = members[j];
                }
            }
            self.repair_loop_record(members[i]);
        }
    }

    /// Merge two loops that have come into contact.
    ///
    /// When markers of different loops come closer than `merge_dist` the
    /// fronts have met: the two cycles are spliced into one at the contact
    /// pair and the pair itself is dropped, leaving a narrow throat that
    /// later regularization smooths out. One merge per call; clusters of
    /// three or more converging loops finish over successive steps.
    pub fn merge_touching_loops(&mut self, merge_dist: f64) {
        if self.loops.len() < 2 {
            return;
        }
        let all = self.loop_members();

        let mut contact = None;
        'search: for (k, first) in all.iter().enumerate() {
            for second in &all[k + 1..] {
                for &a in first {
                    let Some(pa) = self.get(a).map(|m| m.position) else {
                        continue;
                    };
                    for &b in second {
                        let Some(pb) = self.get(b).map(|m| m.position) else {
                            continue;
                        };
                        if (pb - pa).norm() < merge_dist {
                            contact = Some((a, b));
                            break 'search;
                        }
                    }
                }
            }
        }
        let Some((a, b)) = contact else { return };

        let (Some(ma), Some(mb)) = (self.get(a), self.get(b)) else {
            return;
        };
        let (a_next, keep_id) = (ma.next, ma.loop_id);
        let (b_next, gone_id) = (mb.next, mb.loop_id);

        // Cross-link the successors: a -> b_next .. b -> a_next .. a is one
        // closed cycle holding every marker of both loops.
        if let Some(m) = self.get_mut(a) {
            m.next = b_next;
        }
        if let Some(m) = self.get_mut(b_next) {
            m.prev = a;
        }
        if let Some(m) = self.get_mut(b) {
            m.next = a_next;
        }
        if let Some(m) = self.get_mut(a_next) {
            m.prev = b;
        }

        // The absorbed markers change allegiance
        let mut id = a;
        loop {
            let Some(m) = self.get_mut(id) else { break };
            m.loop_id = keep_id;
            id = m.next;
            if id == a {
                break;
            }
        }

        self.loops.retain(|l| l.id != gone_id);
        self.repair_loop_record(a);

        // Drop the contact pair itself so the joint starts clean
        self.remove_marker(a);
        self.remove_marker(b);
    }

    /// Retire every loop that fell below the marker minimum. Returns how many
    /// loops were removed.
    pub fn retire_small_loops(&mut self, min_markers: usize) -> usize {
        let doomed: Vec<Vec<usize>> = self
            .loop_members()
            .into_iter()
            .filter(|members| members.len() < min_markers)
            .collect();
        let count = doomed.len();
        for members in doomed {
            for id in members {
                self.remove_marker(id);
            }
        }
        count
    }

    /// Rewalk a loop from a known-live member, fixing head and length after a
    /// structural edit that bypassed `remove_marker` accounting.
    fn repair_loop_record(&mut self, member: usize) {
        let Some(loop_id) = self.get(member).map(|m| m.loop_id) else {
            return;
        };
        let mut len = 0;
        let mut id = member;
        loop {
            len += 1;
            id = match self.get(id) {
                Some(m) => m.next,
                None => break,
            };
            if id == member {
                break;
            }
        }
        if let Some(l) = self.loops.iter_mut().find(|l| l.id == loop_id) {
            l.head = member;
            l.len = len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(arena: &mut MarkerArena, size: f64) -> u32 {
        // Clockwise square (y-up)
        arena.add_loop(
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, size),
                Vec2::new(size, size),
                Vec2::new(size, 0.0),
            ],
            0.0,
        )
    }

    #[test]
    fn test_loop_links_closed() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);

        let members = &arena.loop_members()[0];
        assert_eq!(members.len(), 4);
        let last = *members.last().unwrap();
        assert_eq!(arena.get(last).unwrap().next, members[0]);
        assert_eq!(arena.get(members[0]).unwrap().prev, last);
    }

    #[test]
    fn test_remove_marker_relinks() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);
        let members = arena.loop_members()[0].clone();

        arena.remove_marker(members[1]);
        assert_eq!(arena.live_count(), 3);
        assert_eq!(arena.get(members[0]).unwrap().next, members[2]);
        assert_eq!(arena.get(members[2]).unwrap().prev, members[0]);
    }

    #[test]
    fn test_midpoint_insertion_reuses_free_slots() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);
        let members = arena.loop_members()[0].clone();
        arena.remove_marker(members[0]);

        // Segment lengths are now > 5, so insertion kicks in and reuses the slot
        arena.insert_midpoints(5.0, 1.0);
        assert!(arena.live_count() > 3);
        assert!(arena.free.is_empty());
    }

    #[test]
    fn test_retire_small_loops() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);
        let members = arena.loop_members()[0].clone();
        arena.remove_marker(members[0]);
        arena.remove_marker(members[1]);

        assert_eq!(arena.retire_small_loops(3), 1);
        assert_eq!(arena.loop_count(), 0);
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_merge_touching_loops_splices_into_one() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);
        // Second square just east of the first; facing sides 0.2 apart
        arena.add_loop(
            &[
                Vec2::new(10.2, 0.0),
                Vec2::new(10.2, 10.0),
                Vec2::new(20.2, 10.0),
                Vec2::new(20.2, 0.0),
            ],
            0.0,
        );
        assert_eq!(arena.loop_count(), 2);

        arena.merge_touching_loops(0.5);

        // One loop remains; the contact pair was dropped during the splice
        assert_eq!(arena.loop_count(), 1);
        assert_eq!(arena.live_count(), 6);
        let members = arena.loop_members()[0].clone();
        assert_eq!(members.len(), 6);
        for &id in &members {
            let m = arena.get(id).unwrap();
            assert_eq!(arena.get(m.next).unwrap().prev, id);
            assert_eq!(m.loop_id, arena.get(members[0]).unwrap().loop_id);
        }
    }

    #[test]
    fn test_merge_leaves_distant_loops_alone() {
        let mut arena = MarkerArena::default();
        square(&mut arena, 10.0);
        arena.add_loop(
            &[
                Vec2::new(50.0, 0.0),
                Vec2::new(50.0, 10.0),
                Vec2::new(60.0, 10.0),
                Vec2::new(60.0, 0.0),
            ],
            0.0,
        );

        arena.merge_touching_loops(0.5);
        assert_eq!(arena.loop_count(), 2);
        assert_eq!(arena.live_count(), 8);
    }

    #[test]
    fn test_excise_pinch_keeps_longer_arc() {
        let mut arena = MarkerArena::default();
        // A loop pinched in the middle: markers 2 and 6 nearly coincide
        let id = arena.add_loop(
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 10.0),
                Vec2::new(5.0, 10.0),
                Vec2::new(10.0, 20.0),
                Vec2::new(15.0, 10.0),
                Vec2::new(10.0, 10.0),
                Vec2::new(5.1, 10.0),
                Vec2::new(5.0, 0.0),
            ],
            0.0,
        );
        assert_eq!(id, 0);

        arena.excise_pinches(0.5);
        // The 3-marker bulge (indices 3..=5) is the shorter arc and is dropped
        assert_eq!(arena.loop_count(), 1);
        assert_eq!(arena.loop_members()[0].len(), 5);
    }
}
