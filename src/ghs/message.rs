/*
    Every message travels over exactly one edge. Because nodes have no names
    for each other, a message identifies the edge it belongs to by carrying the
    edge's weight; weights are distinct, so the receiver can match it against
    its own edge list. Report is the exception: its weight field carries the
    best outgoing weight found in the sender's subtree.
*/

/// Weight used as "no outgoing edge". Never a valid edge weight.
pub const INFINITY: u16 = u16::MAX;

pub type Level = u8;

pub type FragmentId = u16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeState {
    /// Searching for the fragment's minimum-weight outgoing edge.
    Find,
    /// Search finished, waiting for the next phase.
    Found,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Kind {
    Connect = 0,
    Initiate = 1,
    Test = 2,
    Accept = 3,
    Reject = 4,
    ChangeRoot = 5,
    Report = 6,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Message {
    Connect {
        weight: u16,
        level: Level,
    },
    Initiate {
        weight: u16,
        level: Level,
        state: NodeState,
        fragment: FragmentId,
    },
    Test {
        weight: u16,
        level: Level,
        fragment: FragmentId,
    },
    Accept {
        weight: u16,
    },
    Reject {
        weight: u16,
    },
    ChangeRoot {
        weight: u16,
    },
    Report {
        best: u16,
    },
}

impl Kind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Kind::Connect),
            1 => Some(Kind::Initiate),
            2 => Some(Kind::Test),
            3 => Some(Kind::Accept),
            4 => Some(Kind::Reject),
            5 => Some(Kind::ChangeRoot),
            6 => Some(Kind::Report),
            _ => None,
        }
    }

    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Exact number of bytes a frame of this kind occupies on the wire.
    pub fn frame_len(&self) -> usize {
        match self {
            Kind::Connect => 4,
            Kind::Initiate => 7,
            Kind::Test => 6,
            Kind::Accept | Kind::Reject | Kind::ChangeRoot | Kind::Report => 3,
        }
    }
}

impl NodeState {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(NodeState::Find),
            1 => Some(NodeState::Found),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            NodeState::Find => 0,
            NodeState::Found => 1,
        }
    }
}

impl Message {
    pub fn kind(&self) -> Kind {
        match self {
            Message::Connect { .. } => Kind::Connect,
            Message::Initiate { .. } => Kind::Initiate,
            Message::Test { .. } => Kind::Test,
            Message::Accept { .. } => Kind::Accept,
            Message::Reject { .. } => Kind::Reject,
            Message::ChangeRoot { .. } => Kind::ChangeRoot,
            Message::Report { .. } => Kind::Report,
        }
    }

    /// Weight of the edge this message belongs to. `None` for reports, whose
    /// weight field means something else.
    pub fn edge_weight(&self) -> Option<u16> {
        match *self {
            Message::Connect { weight, .. }
            | Message::Initiate { weight, .. }
            | Message::Test { weight, .. }
            | Message::Accept { weight }
            | Message::Reject { weight }
            | Message::ChangeRoot { weight } => Some(weight),
            Message::Report { .. } => None,
        }
    }

    /// Value placed in bytes 1-2 of the frame.
    pub fn weight_field(&self) -> u16 {
        match *self {
            Message::Report { best } => best,
            other => other.edge_weight().unwrap_or(INFINITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for tag in 0..=6u8 {
            let kind = Kind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(Kind::from_tag(7), None);
    }

    #[test]
    fn test_report_has_no_edge_weight() {
        let report = Message::Report { best: 12 };
        assert_eq!(report.edge_weight(), None);
        assert_eq!(report.weight_field(), 12);

        let accept = Message::Accept { weight: 9 };
        assert_eq!(accept.edge_weight(), Some(9));
        assert_eq!(accept.weight_field(), 9);
    }
}
