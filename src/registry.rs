//! 방 레지스트리 (room_id -> Room)

use crate::clock::Timestamp;
use crate::room::{Participant, ParticipantId, PeerSender, Room, Settings};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 공유 방 핸들. 잠금 하나가 하나의 논리적 변경 구간이다.
pub type SharedRoom = Arc<Mutex<Room>>;

pub type RoomGuard = OwnedMutexGuard<Room>;

/// 방 삭제 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    Occupied(usize),
}

impl Room {
    /// 참가자 등록. 실행 중이면 지금부터 세션 시작
    pub fn join(&mut self, display_name: &str, sender: PeerSender, now: Timestamp) -> Participant {
        let participant = Participant {
            display_name: display_name.to_string(),
            id: ParticipantId::new(),
            joined_at: now,
            total_seconds: 0,
            current_session_start: self.timer.is_running().then_some(now),
            join_seq: self.next_seq,
        };
        self.next_seq += 1;

        self.connections.insert(participant.id, sender);
        self.participants.push(participant.clone());

        tracing::info!(
            room_id = %self.id,
            participant_id = %participant.id,
            user_name = %participant.display_name,
            participants = self.participants.len(),
            "User joined room"
        );
        participant
    }

    /// 참가자 제거 (ID 기준, 이미 없으면 None)
    pub fn leave(&mut self, id: ParticipantId) -> Option<Participant> {
        self.connections.remove(&id);
        let index = self.participants.iter().position(|p| p.id == id)?;
        let participant = self.participants.remove(index);

        tracing::info!(
            room_id = %self.id,
            participant_id = %id,
            remaining = self.participants.len(),
            "User left room"
        );
        Some(participant)
    }
}

/// 전체 방 목록
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
    defaults: Settings,
}

impl RoomRegistry {
    pub fn new(defaults: Settings) -> Self {
        Self {
            rooms: DashMap::new(),
            defaults,
        }
    }

    /// 방 가져오기 또는 생성 (멱등)
    pub fn ensure_room(&self, room_id: &str, now: Timestamp) -> SharedRoom {
        // DashMap 가드는 여기서 드롭되므로 호출자가 await 해도 안전
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                tracing::info!(room_id = %room_id, "Room created");
                Arc::new(Mutex::new(Room::new(room_id.to_string(), self.defaults, now)))
            })
            .clone()
    }

    pub fn get(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.get(room_id).map(|room| room.clone())
    }

    /// 방 잠금 획득 (없으면 생성). 가드가 살아 있는 동안이 하나의 변경 구간이다.
    pub async fn lock(&self, room_id: &str, now: Timestamp) -> RoomGuard {
        loop {
            let room = self.ensure_room(room_id, now);
            let guard = room.clone().lock_owned().await;
            if self.is_current(room_id, &room) {
                return guard;
            }
            // 대기 중에 삭제된 방. 새 방으로 다시 시도
            tracing::debug!(room_id = %room_id, "Room removed while waiting for lock, retrying");
        }
    }

    /// 기존 방만 잠금
    pub async fn lock_existing(&self, room_id: &str) -> Option<RoomGuard> {
        loop {
            let room = self.get(room_id)?;
            let guard = room.clone().lock_owned().await;
            if self.is_current(room_id, &room) {
                return Some(guard);
            }
        }
    }

    /// 맵이 아직 이 방 핸들을 가리키는지
    fn is_current(&self, room_id: &str, room: &SharedRoom) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), room))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// 운영자 요청에 의한 명시적 방 삭제. 접속자가 있으면 거부한다.
    pub async fn remove_room(&self, room_id: &str) -> RemoveOutcome {
        let Some(room) = self.get(room_id) else {
            return RemoveOutcome::NotFound;
        };
        let room = room.lock().await;
        let occupants = room.connection_count();
        if occupants > 0 {
            tracing::warn!(room_id = %room_id, occupants, "Refusing to delete occupied room");
            return RemoveOutcome::Occupied(occupants);
        }
        // 잠금을 쥔 상태로 제거하므로 동시 join 과 섞이지 않는다
        self.rooms.remove(room_id);
        tracing::info!(room_id = %room_id, "Room deleted");
        RemoveOutcome::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Mode;
    use chrono::{TimeDelta, TimeZone, Utc};
    use tokio::sync::mpsc;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn sender() -> PeerSender {
        let (tx, _) = mpsc::unbounded_channel();
        tx
    }

    #[tokio::test]
    async fn ensure_room_is_idempotent() {
        let registry = RoomRegistry::new(Settings::default());
        let first = registry.ensure_room("r1", t0());
        first.lock().await.reset(Mode::LongBreak);

        let second = registry.ensure_room("r1", t0());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.timer.remaining_seconds(), 900);
        assert_eq!(registry.room_count(), 1);
    }

    #[tokio::test]
    async fn new_room_uses_registry_defaults() {
        let registry = RoomRegistry::new(Settings::new(50 * 60, 10 * 60, 30 * 60).unwrap());
        let room = registry.lock("r1", t0()).await;
        assert_eq!(room.timer.mode(), Mode::Work);
        assert_eq!(room.timer.remaining_seconds(), 50 * 60);
    }

    #[tokio::test]
    async fn room_keys_are_case_sensitive() {
        let registry = RoomRegistry::new(Settings::default());
        registry.ensure_room("Focus", t0());
        registry.ensure_room("focus", t0());
        assert_eq!(registry.room_count(), 2);
    }

    #[tokio::test]
    async fn lock_existing_does_not_create() {
        let registry = RoomRegistry::new(Settings::default());
        assert!(registry.lock_existing("ghost").await.is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn late_join_starts_session_at_join_time() {
        let registry = RoomRegistry::new(Settings::default());
        let mut room = registry.lock("r1", t0()).await;
        room.join("alice", sender(), t0());
        room.start(t0()).unwrap();

        let late = t0() + TimeDelta::seconds(500);
        let bob = room.join("bob", sender(), late);

        assert_eq!(bob.current_session_start, Some(late));
    }

    #[tokio::test]
    async fn join_while_stopped_has_no_session() {
        let registry = RoomRegistry::new(Settings::default());
        let mut room = registry.lock("r1", t0()).await;
        let alice = room.join("alice", sender(), t0());
        assert_eq!(alice.current_session_start, None);
    }

    #[tokio::test]
    async fn same_name_gets_distinct_identities() {
        let registry = RoomRegistry::new(Settings::default());
        let mut room = registry.lock("r1", t0()).await;
        let first = room.join("sam", sender(), t0());
        let second = room.join("sam", sender(), t0());

        assert_ne!(first.id, second.id);
        room.leave(first.id);

        assert!(room.participant(first.id).is_none());
        assert_eq!(room.participant(second.id).unwrap().display_name, "sam");
    }

    #[tokio::test]
    async fn leave_twice_is_noop() {
        let registry = RoomRegistry::new(Settings::default());
        let mut room = registry.lock("r1", t0()).await;
        let alice = room.join("alice", sender(), t0());

        assert!(room.leave(alice.id).is_some());
        assert!(room.leave(alice.id).is_none());
        assert_eq!(room.connection_count(), 0);
    }

    #[tokio::test]
    async fn empty_room_survives_with_its_state() {
        let registry = RoomRegistry::new(Settings::default());
        {
            let mut room = registry.lock("r1", t0()).await;
            let alice = room.join("alice", sender(), t0());
            room.start(t0()).unwrap();
            room.leave(alice.id);
        }

        let room = registry.lock_existing("r1").await.unwrap();
        assert_eq!(room.connection_count(), 0);
        assert!(room.timer.is_running());
    }

    #[tokio::test]
    async fn rejoin_is_a_fresh_participant() {
        let registry = RoomRegistry::new(Settings::default());
        let mut room = registry.lock("r1", t0()).await;
        let alice = room.join("alice", sender(), t0());
        room.start(t0()).unwrap();
        room.finish_and_reward(t0() + TimeDelta::seconds(1500), Default::default());
        room.leave(alice.id);

        let again = room.join("alice", sender(), t0());

        assert_ne!(again.id, alice.id);
        assert_eq!(again.total_seconds, 0);
    }

    #[tokio::test]
    async fn remove_room_refuses_when_occupied() {
        let registry = RoomRegistry::new(Settings::default());
        let alice = registry.lock("r1", t0()).await.join("alice", sender(), t0());

        assert_eq!(registry.remove_room("r1").await, RemoveOutcome::Occupied(1));

        registry.lock("r1", t0()).await.leave(alice.id);
        assert_eq!(registry.remove_room("r1").await, RemoveOutcome::Removed);
        assert_eq!(registry.remove_room("r1").await, RemoveOutcome::NotFound);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn join_queued_behind_removal_lands_in_live_room() {
        let registry = Arc::new(RoomRegistry::new(Settings::default()));
        let held = registry.lock("r1", t0()).await;

        let remover = tokio::spawn({
            let registry = registry.clone();
            async move { registry.remove_room("r1").await }
        });
        tokio::task::yield_now().await;
        let joiner = tokio::spawn({
            let registry = registry.clone();
            async move { registry.lock("r1", t0()).await.join("alice", sender(), t0()).id }
        });
        tokio::task::yield_now().await;
        drop(held);

        assert_eq!(remover.await.unwrap(), RemoveOutcome::Removed);
        let alice = joiner.await.unwrap();

        assert_eq!(registry.room_count(), 1);
        let room = registry.lock_existing("r1").await.unwrap();
        assert!(room.participant(alice).is_some());
    }
}
