//! Schedule assembly.
//!
//! Turns filled slot items into the final detailed timeline: chronological
//! sort, travel legs with mode selection under the movement-preference cap,
//! meeting/farewell bookends, and a final opening-hours re-validation once
//! every visit's actual clock time is known.
//!
//! No stage errors out: missing coordinates fall back to the area center,
//! missing durations to 60 minutes, so the assembler always yields a
//! complete, orderable schedule even under total external-API failure.

use chrono::NaiveTime;

use crate::models::conditions::{DatePhase, MovementPreferences, TimeSlot, TransportMode};
use crate::models::plan::{minutes_of, time_from_minutes, ItemKind, ScheduleItem};
use crate::services::geo::{self, Coordinate};
use crate::services::opening_hours;

const WALK_MAX_M: f64 = 1800.0;
const MEETING_LEAD_MINUTES: i64 = 15;
const CUSTOM_MEETING_LEAD_MINUTES: i64 = 10;
const CUSTOM_BOOKEND_DISTANCE_M: f64 = 2500.0;
const DEFAULT_VISIT_MINUTES: i64 = 60;

/// Nominal clock times for the active time context, fallbacks pre-applied.
#[derive(Debug, Clone, Copy)]
pub struct SlotTimes {
    pub start: NaiveTime,
    pub lunch: NaiveTime,
    pub activity: NaiveTime,
    pub cafe: NaiveTime,
    pub dinner: NaiveTime,
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Slot times for a named time-slot, or a proportional split of an explicit
/// start + duration window (activity at +30%, cafe at +60%, dinner at +80%).
pub fn nominal_times(slot: TimeSlot, window: Option<(NaiveTime, i64)>) -> SlotTimes {
    if let Some((start, duration)) = window {
        let base = minutes_of(start);
        let at = |share: f64| time_from_minutes(base + (duration as f64 * share) as i64);
        return SlotTimes {
            start,
            lunch: start,
            activity: at(0.3),
            cafe: at(0.6),
            dinner: at(0.8),
        };
    }

    match slot {
        TimeSlot::Dinner => SlotTimes {
            start: t(17, 0),
            // No lunch in an evening plan; the base lunch time remains as the
            // fallback default for period-word parsing.
            lunch: t(12, 0),
            activity: t(17, 0),
            cafe: t(18, 30),
            dinner: t(20, 0),
        },
        TimeSlot::Fullday => SlotTimes {
            start: t(9, 0),
            lunch: t(11, 30),
            activity: t(13, 30),
            cafe: t(15, 30),
            dinner: t(17, 30),
        },
        TimeSlot::Lunch | TimeSlot::Halfday => SlotTimes {
            start: t(12, 0),
            lunch: t(12, 0),
            activity: t(14, 0),
            cafe: t(16, 30),
            dinner: t(18, 0),
        },
    }
}

/// One slot of the itinerary skeleton, before a venue is attached.
#[derive(Debug, Clone, Copy)]
pub struct SlotTemplate {
    pub kind: ItemKind,
    pub time: NaiveTime,
    pub duration_minutes: i64,
}

/// Fixed slot pattern per relationship phase. The casual pattern reshapes for
/// an evening-only time context.
pub fn skeleton_for(phase: DatePhase, time_slot: TimeSlot, times: &SlotTimes) -> Vec<SlotTemplate> {
    let slot = |kind, time, duration_minutes| SlotTemplate {
        kind,
        time,
        duration_minutes,
    };

    match phase {
        DatePhase::First => vec![
            slot(ItemKind::Lunch, times.lunch, 60),
            slot(ItemKind::Activity, times.activity, 90),
            slot(ItemKind::Cafe, times.cafe, 45),
            slot(ItemKind::Dinner, times.dinner, 90),
        ],
        DatePhase::Second => vec![
            slot(ItemKind::Activity, t(10, 0), 120),
            slot(ItemKind::Lunch, times.lunch, 60),
            slot(ItemKind::Walk, times.activity, 60),
            slot(ItemKind::Cafe, times.cafe, 45),
        ],
        DatePhase::Anniversary => vec![
            slot(ItemKind::Lunch, times.lunch, 90),
            slot(ItemKind::Activity, times.activity, 120),
            slot(ItemKind::Dinner, times.dinner, 120),
        ],
        DatePhase::Casual => {
            if time_slot == TimeSlot::Dinner {
                vec![
                    slot(ItemKind::Activity, times.activity, 60),
                    slot(ItemKind::Cafe, times.cafe, 45),
                    slot(ItemKind::Dinner, times.dinner, 90),
                ]
            } else {
                vec![
                    slot(ItemKind::Lunch, times.lunch, 60),
                    slot(ItemKind::Activity, times.activity, 90),
                    slot(ItemKind::Cafe, times.cafe, 45),
                ]
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TravelChoice {
    pub mode: TransportMode,
    pub minutes: i64,
    pub duration_text: String,
    pub reason: String,
}

/// Custom meeting/farewell point carried into the bookend stage.
#[derive(Debug, Clone)]
pub struct BookendOverride {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub map_url: Option<String>,
    pub time: NaiveTime,
}

pub struct ScheduleAssembler {
    pub area: String,
    pub area_center: Coordinate,
    pub movement: MovementPreferences,
    pub restricted_mode: Option<TransportMode>,
}

impl ScheduleAssembler {
    pub fn new(
        area: &str,
        area_center: Coordinate,
        movement: MovementPreferences,
        restricted_mode: Option<TransportMode>,
    ) -> Self {
        ScheduleAssembler {
            area: area.to_string(),
            area_center,
            movement,
            restricted_mode,
        }
    }

    /// Transport mode and duration for one leg. Distance bands choose between
    /// walking and train; an explicit car/taxi/walk restriction replaces the
    /// bands with per-mode time formulas. The movement-preference leg cap
    /// always wins over the band estimate.
    pub fn choose_travel_mode(&self, distance_m: f64) -> TravelChoice {
        let base = match self.restricted_mode {
            Some(TransportMode::Car) => {
                // ~30 km/h in city traffic, plus parking/pickup buffer.
                let minutes = (distance_m / 500.0).round() as i64 + 5;
                TravelChoice {
                    mode: TransportMode::Car,
                    minutes,
                    duration_text: format!("{}min", minutes),
                    reason: "車での移動を前提にしたルートです".to_string(),
                }
            }
            Some(TransportMode::Taxi) => {
                let minutes = (distance_m / 500.0).round() as i64 + 3;
                TravelChoice {
                    mode: TransportMode::Taxi,
                    minutes,
                    duration_text: format!("{}min", minutes),
                    reason: "タクシー移動でスムーズにつなぎます".to_string(),
                }
            }
            Some(TransportMode::Walk) => {
                let minutes = geo::walking_minutes(distance_m);
                TravelChoice {
                    mode: TransportMode::Walk,
                    minutes,
                    duration_text: format!("{}min", minutes),
                    reason: "徒歩のみの移動方針に合わせています".to_string(),
                }
            }
            _ => {
                if distance_m <= WALK_MAX_M {
                    let minutes = geo::walking_minutes(distance_m);
                    TravelChoice {
                        mode: TransportMode::Walk,
                        minutes,
                        duration_text: format!("{}min", minutes),
                        reason: "近距離なので徒歩移動が最適です".to_string(),
                    }
                } else if distance_m <= 4500.0 {
                    TravelChoice {
                        mode: TransportMode::Train,
                        minutes: 10,
                        duration_text: "8-12min".to_string(),
                        reason: "中距離なので電車/地下鉄移動が便利です".to_string(),
                    }
                } else if distance_m <= 7500.0 {
                    TravelChoice {
                        mode: TransportMode::Train,
                        minutes: 15,
                        duration_text: "12-18min".to_string(),
                        reason: "少し距離があるため電車移動を推奨します".to_string(),
                    }
                } else if distance_m <= 12000.0 {
                    TravelChoice {
                        mode: TransportMode::Train,
                        minutes: 22,
                        duration_text: "18-28min".to_string(),
                        reason: "長距離のため電車移動が現実的です".to_string(),
                    }
                } else {
                    TravelChoice {
                        mode: TransportMode::Train,
                        minutes: 30,
                        duration_text: "25-40min".to_string(),
                        reason: "長距離のため電車移動が現実的です".to_string(),
                    }
                }
            }
        };

        let cap = self.movement.max_leg_minutes;
        if base.minutes > cap {
            TravelChoice {
                minutes: cap,
                duration_text: format!("{}min以内", cap),
                reason: format!(
                    "{}（移動方針: {}に合わせて上限{}分）",
                    base.reason, self.movement.label, cap
                ),
                ..base
            }
        } else {
            TravelChoice {
                reason: format!("{}（移動方針: {}）", base.reason, self.movement.label),
                ..base
            }
        }
    }

    /// Expand sorted slot items into the final timeline:
    /// meeting → (travel → visit)* → farewell, then re-check opening hours at
    /// the now-fixed visit times.
    pub fn assemble(
        &self,
        mut slots: Vec<ScheduleItem>,
        mut meeting_override: Option<BookendOverride>,
        mut farewell_override: Option<BookendOverride>,
    ) -> Vec<ScheduleItem> {
        // Stage 4: chronological order by effective minute.
        slots.sort_by_key(|item| item.effective_minutes());

        // Stage 5: coordinates fallback and leg distances (virtual area-center
        // predecessor for the first item).
        let mut prev = self.area_center;
        for item in slots.iter_mut() {
            if item.lat.is_none() || item.lng.is_none() {
                item.lat = Some(self.area_center.lat);
                item.lng = Some(self.area_center.lng);
            }
            let here = Coordinate::new(item.lat.unwrap(), item.lng.unwrap());
            let distance = geo::haversine_distance_m(prev, here).round() as i64;
            item.distance_m = Some(distance);
            prev = here;
        }

        // A custom stop at either end that sits far outside the area pulls the
        // matching bookend to its own location.
        if let Some(first) = slots.first() {
            if first.is_custom && self.distance_from_center(first) > CUSTOM_BOOKEND_DISTANCE_M {
                let start = first.effective_minutes();
                meeting_override = Some(BookendOverride {
                    name: first.place_name.clone(),
                    lat: first.lat.unwrap_or(self.area_center.lat),
                    lng: first.lng.unwrap_or(self.area_center.lng),
                    map_url: first.info_url.clone(),
                    time: time_from_minutes((start - CUSTOM_MEETING_LEAD_MINUTES).max(0)),
                });
            }
        }
        if let Some(last) = slots.last() {
            if last.is_custom && self.distance_from_center(last) > CUSTOM_BOOKEND_DISTANCE_M {
                let end = last.effective_minutes() + last.duration_minutes.max(0);
                farewell_override = Some(BookendOverride {
                    name: last.place_name.clone(),
                    lat: last.lat.unwrap_or(self.area_center.lat),
                    lng: last.lng.unwrap_or(self.area_center.lng),
                    map_url: last.info_url.clone(),
                    time: time_from_minutes(end),
                });
            }
        }

        let station = geo::area_station(&self.area);

        if slots.is_empty() {
            // Nothing to visit at all: still frame a minimal day.
            return vec![
                self.meeting_item(&meeting_override, &station, t(11, 45), t(18, 0)),
                ScheduleItem {
                    time: t(18, 0),
                    kind: ItemKind::Farewell,
                    place_name: format!("{}付近", station.name),
                    lat: Some(self.area_center.lat),
                    lng: Some(self.area_center.lng),
                    area: Some(self.area.clone()),
                    duration_minutes: 0,
                    reason: "今日はありがとうございました。また別のエリアでもデートしましょう！"
                        .to_string(),
                    ..ScheduleItem::default()
                },
            ];
        }

        // Stage 8a: meeting bookend, 15 minutes before the first slot's
        // nominal time unless overridden.
        let first_nominal = minutes_of(slots[0].time);
        let default_meeting = time_from_minutes((first_nominal - MEETING_LEAD_MINUTES).max(0));
        let mut detailed = vec![self.meeting_item(
            &meeting_override,
            &station,
            default_meeting,
            time_from_minutes(first_nominal),
        )];

        // Stage 7: walk the slots, inserting travel legs and fixing visit
        // clock times.
        let mut clock = slots[0].effective_minutes().min(first_nominal);
        for i in 0..slots.len() {
            let item = &slots[i];
            let preferred = item.preferred_start_minutes;

            if i > 0 {
                let distance = item.distance_m.unwrap_or(0);
                let choice = self.choose_travel_mode(distance as f64);
                if choice.minutes > 0 {
                    // Leave early enough to land at the preferred start when
                    // the capped leg allows it, never before the running clock.
                    let mut travel_start = clock;
                    if let Some(preferred) = preferred {
                        if preferred - choice.minutes > clock {
                            travel_start = preferred - choice.minutes;
                        }
                    }
                    let travel_end = travel_start + choice.minutes;
                    let origin = slots[i - 1].lat.zip(slots[i - 1].lng).map(|(lat, lng)| Coordinate::new(lat, lng));
                    let destination = item.lat.zip(item.lng).map(|(lat, lng)| Coordinate::new(lat, lng));

                    let directions_note = (choice.mode == TransportMode::Train).then(|| {
                        format!(
                            "{} から {} は公共交通機関（{}）を推奨します。Googleマップのルート案内で路線と乗換を確認してください。",
                            slots[i - 1].place_name,
                            item.place_name,
                            choice.mode.label()
                        )
                    });

                    detailed.push(ScheduleItem {
                        time: time_from_minutes(travel_start),
                        end_time: Some(time_from_minutes(travel_end)),
                        kind: ItemKind::Travel,
                        place_name: format!("移動（{}）", choice.mode.label()),
                        duration_minutes: choice.minutes,
                        reason: choice.reason.clone(),
                        distance_m: Some(distance),
                        transport_mode: Some(choice.mode),
                        transport_label: Some(choice.mode.label().to_string()),
                        travel_minutes: Some(choice.minutes),
                        directions_url: geo::directions_url(origin, destination),
                        directions_note,
                        ..ScheduleItem::default()
                    });
                    clock = travel_end;
                }
            }

            // Visit start snaps up to the next 10-minute boundary.
            let duration = if item.duration_minutes > 0 {
                item.duration_minutes
            } else {
                DEFAULT_VISIT_MINUTES
            };
            let earliest = clock.max(preferred.unwrap_or(clock));
            let visit_start = round_up_to_10(earliest);
            let visit_end = visit_start + duration;

            let mut visit = item.clone();
            visit.time = time_from_minutes(visit_start);
            visit.end_time = Some(time_from_minutes(visit_end));
            visit.duration_minutes = duration;
            detailed.push(visit);
            clock = visit_end;
        }

        // Stage 8b: farewell bookend at the computed end of the day.
        let farewell_time = match &farewell_override {
            Some(over) => minutes_of(over.time).max(clock),
            None => clock,
        };
        let farewell = match &farewell_override {
            Some(over) => ScheduleItem {
                time: time_from_minutes(farewell_time),
                kind: ItemKind::Farewell,
                place_name: over.name.clone(),
                lat: Some(over.lat),
                lng: Some(over.lng),
                area: Some(self.area.clone()),
                duration_minutes: 0,
                reason: format!("ユーザー指定の解散場所: {}", over.name),
                info_url: over.map_url.clone(),
                ..ScheduleItem::default()
            },
            None => ScheduleItem {
                time: time_from_minutes(farewell_time),
                kind: ItemKind::Farewell,
                place_name: format!("{}付近", station.name),
                lat: Some(self.area_center.lat),
                lng: Some(self.area_center.lng),
                area: Some(self.area.clone()),
                duration_minutes: 0,
                reason: "楽しい一日の終わり。次のデートの約束もここで。".to_string(),
                ..ScheduleItem::default()
            },
        };
        detailed.push(farewell);

        // Stage 9: legs shifted every visit away from its nominal estimate, so
        // opening hours are judged again at the final clock times.
        self.revalidate_opening_hours(&mut detailed);

        detailed
    }

    fn meeting_item(
        &self,
        meeting_override: &Option<BookendOverride>,
        station: &geo::Station,
        default_time: NaiveTime,
        latest: NaiveTime,
    ) -> ScheduleItem {
        match meeting_override {
            Some(over) => ScheduleItem {
                // Clamped so the meeting never lands after the first stop.
                time: over.time.min(latest),
                kind: ItemKind::Meeting,
                place_name: over.name.clone(),
                lat: Some(over.lat),
                lng: Some(over.lng),
                area: Some(self.area.clone()),
                duration_minutes: 0,
                reason: format!("ユーザー指定の集合場所: {}", over.name),
                info_url: over.map_url.clone(),
                ..ScheduleItem::default()
            },
            None => ScheduleItem {
                time: default_time,
                kind: ItemKind::Meeting,
                place_name: format!("{} {}", station.name, station.exit),
                lat: Some(self.area_center.lat),
                lng: Some(self.area_center.lng),
                area: Some(self.area.clone()),
                duration_minutes: 0,
                reason: "デートのスタート地点。待ち合わせ場所は目立つ場所を選びましょう。"
                    .to_string(),
                ..ScheduleItem::default()
            },
        }
    }

    fn distance_from_center(&self, item: &ScheduleItem) -> f64 {
        match (item.lat, item.lng) {
            (Some(lat), Some(lng)) => {
                geo::haversine_distance_m(self.area_center, Coordinate::new(lat, lng))
            }
            _ => 0.0,
        }
    }

    fn revalidate_opening_hours(&self, schedule: &mut [ScheduleItem]) {
        for item in schedule.iter_mut() {
            if !item.kind.is_visit() || item.opening_hours.is_empty() {
                continue;
            }
            if opening_hours::is_open_at(&item.opening_hours, item.time) {
                item.closure_warning = None;
            } else {
                item.closure_warning = Some(format!(
                    "{}時点では営業時間外の可能性があります。営業時間をご確認ください。",
                    item.time.format("%H:%M")
                ));
            }
        }
    }
}

fn round_up_to_10(minutes: i64) -> i64 {
    (minutes + 9) / 10 * 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conditions::MovementPreferences;

    fn assembler() -> ScheduleAssembler {
        ScheduleAssembler::new(
            "shibuya",
            Coordinate::new(35.6595, 139.7004),
            MovementPreferences::for_style(None),
            None,
        )
    }

    fn visit(kind: ItemKind, name: &str, time: NaiveTime, duration: i64, lat: f64, lng: f64) -> ScheduleItem {
        ScheduleItem {
            time,
            kind,
            place_name: name.to_string(),
            lat: Some(lat),
            lng: Some(lng),
            duration_minutes: duration,
            ..ScheduleItem::default()
        }
    }

    fn default_slots() -> Vec<ScheduleItem> {
        vec![
            visit(ItemKind::Lunch, "ランチ", t(12, 0), 60, 35.6604, 139.7017),
            visit(ItemKind::Activity, "美術館", t(14, 0), 90, 35.6597, 139.7006),
            visit(ItemKind::Cafe, "カフェ", t(16, 30), 45, 35.6591, 139.7006),
        ]
    }

    #[test]
    fn skeleton_patterns_follow_the_phase() {
        let times = nominal_times(TimeSlot::Lunch, None);
        let first: Vec<ItemKind> = skeleton_for(DatePhase::First, TimeSlot::Lunch, &times)
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            first,
            vec![ItemKind::Lunch, ItemKind::Activity, ItemKind::Cafe, ItemKind::Dinner]
        );

        let second: Vec<ItemKind> = skeleton_for(DatePhase::Second, TimeSlot::Lunch, &times)
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            second,
            vec![ItemKind::Activity, ItemKind::Lunch, ItemKind::Walk, ItemKind::Cafe]
        );

        let evening: Vec<ItemKind> = skeleton_for(DatePhase::Casual, TimeSlot::Dinner, &times)
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(evening, vec![ItemKind::Activity, ItemKind::Cafe, ItemKind::Dinner]);
    }

    #[test]
    fn explicit_window_splits_proportionally() {
        let times = nominal_times(TimeSlot::Lunch, Some((t(10, 0), 300)));
        assert_eq!(times.lunch, t(10, 0));
        assert_eq!(times.activity, t(11, 30)); // +30% of 5h
        assert_eq!(times.cafe, t(13, 0)); // +60%
        assert_eq!(times.dinner, t(14, 0)); // +80%
    }

    #[test]
    fn mode_thresholds_match_the_distance_bands() {
        let asm = assembler();
        let walk = asm.choose_travel_mode(1000.0);
        assert_eq!(walk.mode, TransportMode::Walk);
        assert_eq!(walk.minutes, 12);

        let train = asm.choose_travel_mode(9000.0);
        assert_eq!(train.mode, TransportMode::Train);
        assert_eq!(train.minutes, 22);
        assert_eq!(train.duration_text, "18-28min");
    }

    #[test]
    fn leg_cap_clamps_and_annotates() {
        let mut asm = assembler();
        asm.movement = MovementPreferences::for_style(Some(crate::models::conditions::MovementStyle::SingleArea));
        let long = asm.choose_travel_mode(13000.0);
        assert_eq!(long.minutes, 15);
        assert_eq!(long.duration_text, "15min以内");
        assert!(long.reason.contains("上限15分"));
    }

    #[test]
    fn restricted_modes_use_their_formulas() {
        let mut asm = assembler();
        asm.restricted_mode = Some(TransportMode::Car);
        let car = asm.choose_travel_mode(6000.0);
        assert_eq!(car.mode, TransportMode::Car);
        assert_eq!(car.minutes, 17); // 12min at 30km/h + 5

        asm.restricted_mode = Some(TransportMode::Taxi);
        assert_eq!(asm.choose_travel_mode(6000.0).minutes, 15);

        asm.restricted_mode = Some(TransportMode::Walk);
        assert_eq!(asm.choose_travel_mode(6000.0).mode, TransportMode::Walk);
    }

    #[test]
    fn timeline_is_monotonic_and_framed_by_bookends() {
        let schedule = assembler().assemble(default_slots(), None, None);

        assert_eq!(schedule.first().unwrap().kind, ItemKind::Meeting);
        assert_eq!(schedule.last().unwrap().kind, ItemKind::Farewell);
        // Meeting 15 minutes before the first nominal slot time.
        assert_eq!(schedule[0].time, t(11, 45));

        for pair in schedule.windows(2) {
            assert!(
                pair[0].time <= pair[1].time,
                "schedule out of order: {} then {}",
                pair[0].time,
                pair[1].time
            );
        }
        // Every item received coordinates.
        assert!(schedule.iter().all(|i| i.lat.is_some() && i.lng.is_some()));
    }

    #[test]
    fn visit_starts_round_up_to_ten_minutes() {
        let slots = vec![
            visit(ItemKind::Lunch, "ランチ", t(12, 0), 60, 35.6604, 139.7017),
            // ~1.6km away: a real walking leg lands mid-interval.
            visit(ItemKind::Activity, "公園", t(13, 0), 60, 35.6704, 139.7028),
        ];
        let schedule = assembler().assemble(slots, None, None);

        use chrono::Timelike;
        for item in schedule.iter().filter(|i| i.kind.is_visit()) {
            assert_eq!(item.time.minute() % 10, 0, "visit not aligned: {}", item.time);
        }
    }

    #[test]
    fn custom_preferred_time_schedules_travel_to_arrive_on_time() {
        let mut slots = default_slots();
        slots.push(ScheduleItem {
            time: t(19, 0),
            kind: ItemKind::Custom,
            place_name: "浅草寺".to_string(),
            lat: Some(35.7148),
            lng: Some(139.7967),
            duration_minutes: 60,
            is_custom: true,
            preferred_start_minutes: Some(19 * 60),
            ..ScheduleItem::default()
        });

        let schedule = assembler().assemble(slots, None, None);
        let custom = schedule.iter().find(|i| i.is_custom).unwrap();
        // 19:00 preferred, running clock ends 17:15ish: visit starts 19:00.
        assert_eq!(custom.time, t(19, 0));

        // The leg before it departs early enough to arrive by 19:00.
        let custom_index = schedule.iter().position(|i| i.is_custom).unwrap();
        let leg = &schedule[custom_index - 1];
        assert_eq!(leg.kind, ItemKind::Travel);
        assert_eq!(minutes_of(leg.end_time.unwrap()), 19 * 60);
    }

    #[test]
    fn distant_custom_last_stop_moves_the_farewell() {
        let mut slots = default_slots();
        // Asakusa is ~10km from Shibuya center, beyond the 2.5km threshold.
        slots.push(ScheduleItem {
            time: t(19, 0),
            kind: ItemKind::Custom,
            place_name: "浅草寺".to_string(),
            lat: Some(35.7148),
            lng: Some(139.7967),
            duration_minutes: 60,
            is_custom: true,
            preferred_start_minutes: Some(19 * 60),
            ..ScheduleItem::default()
        });

        let schedule = assembler().assemble(slots, None, None);
        let farewell = schedule.last().unwrap();
        assert_eq!(farewell.kind, ItemKind::Farewell);
        assert_eq!(farewell.place_name, "浅草寺");
        assert_eq!(farewell.time, t(20, 0));
    }

    #[test]
    fn empty_slot_list_still_frames_a_day() {
        let schedule = assembler().assemble(Vec::new(), None, None);
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].kind, ItemKind::Meeting);
        assert_eq!(schedule[1].kind, ItemKind::Farewell);
        assert!(schedule.iter().all(|i| i.lat.is_some() && i.lng.is_some()));
    }

    #[test]
    fn closure_warning_reflects_the_final_time_not_the_nominal_one() {
        use chrono::{Datelike, Local};
        // Whatever today is, build an entry for today's weekday closing at 18:00.
        let weekday_ja = match Local::now().weekday() {
            chrono::Weekday::Mon => "月曜日",
            chrono::Weekday::Tue => "火曜日",
            chrono::Weekday::Wed => "水曜日",
            chrono::Weekday::Thu => "木曜日",
            chrono::Weekday::Fri => "金曜日",
            chrono::Weekday::Sat => "土曜日",
            chrono::Weekday::Sun => "日曜日",
        };
        let hours = vec![format!("{}: 11:00～18:00", weekday_ja)];

        // Nominal 17:30 looks open, but a 19:00 custom preference pushes the
        // final time past closing.
        let mut item = visit(ItemKind::Dinner, "レストラン", t(17, 30), 90, 35.6604, 139.7017);
        item.opening_hours = hours;
        item.preferred_start_minutes = Some(19 * 60);

        let schedule = assembler().assemble(vec![item], None, None);
        let dinner = schedule.iter().find(|i| i.kind == ItemKind::Dinner).unwrap();
        assert_eq!(dinner.time, t(19, 0));
        assert!(dinner.closure_warning.is_some());
    }
}
