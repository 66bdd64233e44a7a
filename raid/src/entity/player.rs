use std::{
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        RwLock,
    },
    time::{
        Duration,
        Instant,
    },
};

use nalgebra::{
    Vector2,
    Vector3,
};
use raid_memory::{
    MemoryError,
    RemoteAddress,
    ScatterBatch,
};
use raid_offsets::PlayerField;
use serde::Serialize;

use crate::{
    sync::{
        read,
        write,
    },
    Bone,
    Capabilities,
    EntityKind,
    Gear,
    RadarSettings,
    ResolveContext,
    ResolveError,
    ResolveResult,
    Session,
    Side,
    Skeleton,
    TransformVertex,
    Watchlist,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifeState {
    /// Registered within the game world
    Alive,

    /// No longer registered but a corpse has been left behind
    Dead { corpse: RemoteAddress },

    /// No longer registered and nothing is left behind (extracted or disconnected)
    Departed,
}

#[derive(Debug, Clone)]
struct PlayerState {
    life: LifeState,
    position: Option<Vector3<f32>>,
    rotation: Option<Vector2<f32>>,
    last_position_update: Option<Instant>,
}

pub struct PlayerEntity {
    address: RemoteAddress,
    kind: EntityKind,
    capabilities: Capabilities,

    nickname: String,
    account_id: String,
    side: Side,
    group_number: Option<usize>,
    watch_reason: Option<String>,

    corpse_slot: RemoteAddress,
    rotation_address: RemoteAddress,
    slots: Option<RemoteAddress>,
    skeleton: Skeleton,

    state: RwLock<PlayerState>,
    error: AtomicBool,
    gear: RwLock<Option<Gear>>,
}

/// Map a null pointer at the end of a chain to `None`.
fn optional<T>(result: ResolveResult<T>) -> ResolveResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ResolveError::BrokenChain { source, .. })
            if matches!(source.source, MemoryError::NullPointer { .. }) =>
        {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

impl PlayerEntity {
    pub fn resolve(
        ctx: &ResolveContext,
        address: RemoteAddress,
        settings: &RadarSettings,
        session: &Session,
        watchlist: &Watchlist,
    ) -> ResolveResult<Self> {
        let class_name = ctx.read_class_name(address)?;
        let kind = EntityKind::from_class_name(&class_name, ctx.table.type_tags()).ok_or_else(
            || ResolveError::StructuralMismatch {
                address,
                found: class_name.clone(),
            },
        )?;
        let capabilities = kind.capabilities(settings);

        let nickname = ctx.read_string_field(capabilities.name, address)?;
        let account_id = ctx.read_string_field(kind.field(PlayerField::AccountId), address)?;
        let group_id =
            optional(ctx.read_string_field(kind.field(PlayerField::GroupId), address))?
                .unwrap_or_default();
        let side = Side::from(ctx.read_value::<i32>(kind.field(PlayerField::Side), address)?);

        let corpse_slot = ctx.walk(kind.field(PlayerField::Corpse), address)?;
        let rotation_address = ctx.walk(capabilities.rotation, address)?;
        let slots = if capabilities.gear {
            optional(ctx.walk(kind.field(PlayerField::Slots), address))?
        } else {
            None
        };

        let bone_list = ctx.walk(kind.field(PlayerField::Bones), address)?;
        let skeleton = Skeleton::resolve(ctx, bone_list, capabilities.skeleton)?;

        log::debug!(
            "Resolved {:?} player {} at {} ({} bones)",
            kind,
            nickname,
            address,
            skeleton.len()
        );
        Ok(Self {
            address,
            kind,
            capabilities,

            group_number: session.group_number(&group_id),
            watch_reason: watchlist.reason(&account_id).map(str::to_string),
            nickname,
            account_id,
            side,

            corpse_slot,
            rotation_address,
            slots,
            skeleton,

            state: RwLock::new(PlayerState {
                life: LifeState::Alive,
                position: None,
                rotation: None,
                last_position_update: None,
            }),
            error: AtomicBool::new(false),
            gear: RwLock::new(None),
        })
    }

    pub fn address(&self) -> RemoteAddress {
        self.address
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn group_number(&self) -> Option<usize> {
        self.group_number
    }

    pub fn watch_reason(&self) -> Option<&str> {
        self.watch_reason.as_deref()
    }

    /// Address of the corpse pointer
    pub fn corpse_slot(&self) -> RemoteAddress {
        self.corpse_slot
    }

    pub fn rotation_address(&self) -> RemoteAddress {
        self.rotation_address
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn life(&self) -> LifeState {
        read(&self.state).life
    }

    pub fn position(&self) -> Option<Vector3<f32>> {
        read(&self.state).position
    }

    pub fn rotation(&self) -> Option<Vector2<f32>> {
        read(&self.state).rotation
    }

    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }

    pub fn set_error(&self) {
        self.error.store(true, Ordering::Relaxed);
    }

    pub fn clear_error(&self) {
        self.error.store(false, Ordering::Relaxed);
    }

    fn set_life(&self, life: LifeState) -> bool {
        let mut state = write(&self.state);
        if state.life == life {
            return false;
        }

        log::debug!(
            "Player {} ({}) {:?} -> {:?}",
            self.nickname,
            self.address,
            state.life,
            life
        );
        state.life = life;
        true
    }

    /// Returns true if the state has changed.
    pub fn mark_alive(&self) -> bool {
        self.set_life(LifeState::Alive)
    }

    pub fn mark_dead(&self, corpse: RemoteAddress) -> bool {
        self.set_life(LifeState::Dead { corpse })
    }

    pub fn mark_departed(&self) -> bool {
        self.set_life(LifeState::Departed)
    }

    /// Accept a new rotation (yaw, pitch) in degrees.
    /// Implausible values are rejected and the previous rotation is kept.
    pub fn apply_rotation(&self, rotation: Vector2<f32>) -> ResolveResult<()> {
        let plausible = rotation.iter().all(|value| value.is_finite())
            && (0.0..=360.0).contains(&rotation.x)
            && (-90.0..=90.0).contains(&rotation.y);
        if !plausible {
            return Err(ResolveError::implausible(
                "rotation",
                format!("({}, {})", rotation.x, rotation.y),
            ));
        }

        write(&self.state).rotation = Some(rotation);
        Ok(())
    }

    pub fn apply_position(&self, position: Vector3<f32>) {
        let mut state = write(&self.state);
        state.position = Some(position);
        state.last_position_update = Some(Instant::now());
    }

    /// Time since the last successful position update
    pub fn position_age(&self) -> Option<Duration> {
        read(&self.state)
            .last_position_update
            .map(|update| update.elapsed())
    }

    /// The nickname or the stale label once the position stopped updating.
    pub fn display_name<'a>(&'a self, settings: &'a RadarSettings) -> &'a str {
        if !self.has_error() {
            return &self.nickname;
        }

        let stale = match self.position_age() {
            Some(age) => age >= settings.stale_after(),
            None => true,
        };
        if stale {
            &settings.stale_label
        } else {
            &self.nickname
        }
    }

    /// Enqueue the rotation and one vertex buffer read per transform.
    pub fn prepare_realtime<'a>(&'a self, batch: &mut ScatterBatch<'a>) {
        batch.prepare_read::<Vector2<f32>>(self.rotation_address, move |rotation| {
            let result = rotation
                .map_err(ResolveError::unreadable("rotation"))
                .and_then(|rotation| self.apply_rotation(rotation));

            if result.is_err() {
                self.set_error();
            }
            Ok(result?)
        });

        for (bone, slot) in self.skeleton.bones() {
            let bone = *bone;
            let transform = slot.current();
            batch.prepare_read_array::<TransformVertex>(
                transform.vertices(),
                transform.vertex_count(),
                move |vertices| {
                    let position = match vertices
                        .map_err(ResolveError::unreadable("transform vertices"))
                        .and_then(|vertices| transform.apply_vertices(&vertices))
                    {
                        Ok(position) => position,
                        Err(err) => {
                            self.set_error();
                            return Err(err.into());
                        }
                    };

                    if bone == Bone::Root {
                        self.apply_position(position);
                    }
                    Ok(())
                },
            );
        }
    }

    pub fn gear(&self) -> Option<Gear> {
        read(&self.gear).clone()
    }

    pub fn gear_outdated(&self, interval: Duration) -> bool {
        if !self.capabilities.gear || self.slots.is_none() {
            return false;
        }

        match &*read(&self.gear) {
            Some(gear) => gear.refreshed_at.elapsed() >= interval,
            None => true,
        }
    }

    pub fn refresh_gear(&self, ctx: &ResolveContext) -> ResolveResult<()> {
        let slots = match self.slots {
            Some(slots) => slots,
            None => return Ok(()),
        };

        let gear = Gear::resolve(ctx, slots)?;
        *write(&self.gear) = Some(gear);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::Duration,
    };

    use nalgebra::Vector2;
    use raid_memory::{
        RemoteAddress,
        ScatterBatch,
    };

    use super::{
        LifeState,
        PlayerEntity,
    };
    use crate::{
        test_support::{
            PlayerTemplate,
            TestProcess,
        },
        EntityKind,
        RadarSettings,
        ResolveError,
        Session,
        Side,
        Watchlist,
    };

    fn resolve(process: &TestProcess, address: RemoteAddress) -> Result<PlayerEntity, ResolveError> {
        let mut watchlist = Watchlist::default();
        watchlist.insert("7001", "streamer");

        PlayerEntity::resolve(
            &process.context(),
            address,
            &RadarSettings::default(),
            &Session::new(),
            &watchlist,
        )
    }

    #[test]
    fn resolves_observed_players() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate {
            account_id: "7001".to_string(),
            group_id: "squad".to_string(),
            side: 2,
            ..PlayerTemplate::observed("Birdeye")
        });

        let player = resolve(&process, address).unwrap();
        assert_eq!(player.kind(), EntityKind::Observed);
        assert_eq!(player.nickname(), "Birdeye");
        assert_eq!(player.side(), Side::Bear);
        assert_eq!(player.group_number(), Some(1));
        assert_eq!(player.watch_reason(), Some("streamer"));
        assert_eq!(player.skeleton().len(), 17);
        assert_eq!(player.life(), LifeState::Alive);
    }

    #[test]
    fn local_player_has_root_only() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate::local("me"));

        let player = resolve(&process, address).unwrap();
        assert_eq!(player.kind(), EntityKind::Local);
        assert_eq!(player.skeleton().len(), 1);
        assert_eq!(player.group_number(), None);
    }

    #[test]
    fn rejects_foreign_objects() {
        let process = TestProcess::new();
        let object = process.create_object("LootableContainer");

        assert!(matches!(
            resolve(&process, object),
            Err(ResolveError::StructuralMismatch { found, .. }) if found == "LootableContainer"
        ));
    }

    #[test]
    fn realtime_reads_rotation_and_pose() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate {
            position: [12.0, 3.0, -40.0],
            rotation: [90.0, -10.0],
            ..PlayerTemplate::observed("Glukhar")
        });
        let player = resolve(&process, address).unwrap();

        let mut batch = ScatterBatch::new();
        player.prepare_realtime(&mut batch);
        assert_eq!(batch.len(), 1 + 17);

        let report = batch.execute(&*process.image);
        assert_eq!(report.unreadable + report.rejected, 0);
        assert_eq!(player.rotation(), Some(Vector2::new(90.0, -10.0)));

        let position = player.position().unwrap();
        assert!((position.x - 12.0).abs() < 1e-4);
        assert!((position.z + 40.0).abs() < 1e-4);
        assert!(!player.has_error());
    }

    #[test]
    fn display_name_turns_stale() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate::observed("Reshala"));
        let player = resolve(&process, address).unwrap();

        let settings = RadarSettings {
            stale_after_ms: 10,
            ..Default::default()
        };
        player.apply_position(Default::default());
        assert_eq!(player.display_name(&settings), "Reshala");

        player.set_error();
        assert_eq!(player.display_name(&settings), "Reshala");

        thread::sleep(Duration::from_millis(20));
        assert_eq!(player.display_name(&settings), "<stale>");

        player.clear_error();
        assert_eq!(player.display_name(&settings), "Reshala");
    }

    #[test]
    fn life_transitions_report_changes() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate::observed("Shturman"));
        let player = resolve(&process, address).unwrap();

        assert!(!player.mark_alive());
        assert!(player.mark_dead(RemoteAddress(0x9999)));
        assert!(!player.mark_dead(RemoteAddress(0x9999)));
        assert!(player.mark_departed());
        assert!(player.mark_alive());
    }

    #[test]
    fn refreshes_gear() {
        let process = TestProcess::new();
        let address = process.create_player(&PlayerTemplate {
            gear: vec![("Scabbard".to_string(), Some("57cd379a24597778e7682ecf".to_string()))],
            ..PlayerTemplate::observed("Sanitar")
        });
        let player = resolve(&process, address).unwrap();

        assert!(player.gear_outdated(Duration::from_secs(30)));
        player.refresh_gear(&process.context()).unwrap();
        assert!(!player.gear_outdated(Duration::from_secs(30)));

        let gear = player.gear().unwrap();
        assert_eq!(gear.items.len(), 1);
        assert_eq!(gear.items[0].template_id, "57cd379a24597778e7682ecf");
    }
}
