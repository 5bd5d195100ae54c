//! 床位、病房与手术室资源目录

use inpatient_core::{
    Bed, BedStatus, BedType, Building, InpatientError, OperationTheater, Placement, PlacementRate,
    Result, Room, RoomStatus, SystemScope, Ward,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 状态转换对资源的副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEffect {
    Bed(Uuid, BedStatus),
    Room(Uuid, RoomStatus),
}

/// 资源目录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementDirectory {
    beds: HashMap<Uuid, Bed>,
    rooms: HashMap<Uuid, Room>,
    theaters: HashMap<Uuid, OperationTheater>,
}

impl PlacementDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bed(&mut self, bed: Bed) {
        tracing::debug!("Registered bed {} ({})", bed.name, bed.id);
        self.beds.insert(bed.id, bed);
    }

    pub fn add_room(&mut self, room: Room) {
        tracing::debug!("Registered room {} ({})", room.name, room.id);
        self.rooms.insert(room.id, room);
    }

    pub fn add_theater(&mut self, theater: OperationTheater) {
        tracing::debug!("Registered operation theater {} ({})", theater.name, theater.id);
        self.theaters.insert(theater.id, theater);
    }

    pub fn bed(&self, id: Uuid) -> Option<&Bed> {
        self.beds.get(&id)
    }

    pub fn room(&self, id: Uuid) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn theater(&self, id: Uuid) -> Option<&OperationTheater> {
        self.theaters.get(&id)
    }

    pub fn theaters(&self) -> impl Iterator<Item = &OperationTheater> {
        self.theaters.values()
    }

    /// 校验分配的资源存在
    pub fn ensure_exists(&self, placement: Placement) -> Result<()> {
        match placement {
            Placement::Unassigned => Ok(()),
            Placement::Bed(id) if self.beds.contains_key(&id) => Ok(()),
            Placement::Room(id) if self.rooms.contains_key(&id) => Ok(()),
            Placement::Bed(id) => Err(InpatientError::NotFound(format!("Bed {} not found", id))),
            Placement::Room(id) => Err(InpatientError::NotFound(format!("Room {} not found", id))),
        }
    }

    /// 分配资源的日租金
    pub fn rates_for(&self, placement: Placement) -> PlacementRate {
        PlacementRate {
            bed: placement.bed_id().and_then(|id| self.beds.get(&id)).map(|b| b.daily_rent),
            room: placement.room_id().and_then(|id| self.rooms.get(&id)).map(|r| r.daily_rent),
        }
    }

    /// 床位所属病区
    pub fn ward_of(&self, placement: Placement) -> Option<&Ward> {
        placement
            .bed_id()
            .and_then(|id| self.beds.get(&id))
            .and_then(|bed| bed.ward.as_ref())
    }

    /// 病房所属楼栋
    pub fn building_of(&self, placement: Placement) -> Option<&Building> {
        placement
            .room_id()
            .and_then(|id| self.rooms.get(&id))
            .and_then(|room| room.building.as_ref())
    }

    /// 指定床型下当前可用的床位
    pub fn available_beds(&self, bed_type: Option<BedType>) -> Vec<&Bed> {
        let mut beds: Vec<&Bed> = self
            .beds
            .values()
            .filter(|b| b.status == BedStatus::Available && b.bed_type == bed_type)
            .collect();
        beds.sort_by(|a, b| a.name.cmp(&b.name));
        beds
    }

    /// 指定床型下当前可用的病房
    pub fn available_rooms(&self, bed_type: Option<BedType>) -> Vec<&Room> {
        let mut rooms: Vec<&Room> = self
            .rooms
            .values()
            .filter(|r| r.status == RoomStatus::Available && r.bed_type == bed_type)
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }

    /// 校验副作用引用的资源都存在
    pub fn check_effects(&self, effects: &[ResourceEffect]) -> Result<()> {
        for effect in effects {
            match effect {
                ResourceEffect::Bed(id, _) if !self.beds.contains_key(id) => {
                    return Err(InpatientError::NotFound(format!("Bed {} not found", id)));
                }
                ResourceEffect::Room(id, _) if !self.rooms.contains_key(id) => {
                    return Err(InpatientError::NotFound(format!("Room {} not found", id)));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// 写入资源状态，不检查原状态
    pub fn apply(&mut self, scope: &SystemScope, effects: &[ResourceEffect]) -> Result<()> {
        self.check_effects(effects)?;

        for effect in effects {
            match *effect {
                ResourceEffect::Bed(id, status) => {
                    if let Some(bed) = self.beds.get_mut(&id) {
                        tracing::debug!("Bed {} status {:?} -> {:?} ({})", bed.name, bed.status, status, scope.reason());
                        bed.status = status;
                    }
                }
                ResourceEffect::Room(id, status) => {
                    if let Some(room) = self.rooms.get_mut(&id) {
                        tracing::debug!("Room {} status {:?} -> {:?} ({})", room.name, room.status, status, scope.reason());
                        room.status = status;
                    }
                }
            }
        }

        Ok(())
    }
}
