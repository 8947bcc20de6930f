pub mod clock;
pub mod error;
pub mod fetch;
pub mod models;
pub mod occupancy;
pub mod regulation;
pub mod selection;
pub mod session;
pub mod settings;
pub mod spatial;
pub mod time;
pub mod trajectory;

pub use clock::SimulationClock;
pub use error::{CoreError, CoreResult};
pub use fetch::{DataState, FetchKind, RequestGate, Ticket};
pub use models::{
    ActiveWindow, AircraftPosition, ArrivalDetail, DelayStats, FlightIdSet, FlightSegment,
    FlowExtraction, FlowQuery, Hotspot, ObjectiveWeights, OccupancySnapshot, RankedArrivals,
    RankedFlight, RankingQuery, Regulation, RegulationDraft, RegulationSpec, RollingTrafficVolume,
    SectorInfo, SimulationRequest, SimulationResult, SlackDistribution, SlackEntry, SlackSign,
};
pub use occupancy::{rolling_sums, RollingBin, RollingOccupancy};
pub use regulation::{resolve_token, time_window_bins, RegulationPlan};
pub use selection::{
    active_hotspots, focus_flight_ids, regulation_candidates, ArrivalSource, SelectionChanges,
    SelectionInputs, SelectionManager, Tracked,
};
pub use session::{SessionUpdate, SimulationSession};
pub use settings::{EngineSettings, FlightLevelBand, WrapMode};
pub use spatial::bearing_deg;
pub use trajectory::{FlightSet, Trajectory, TrajectorySample};
